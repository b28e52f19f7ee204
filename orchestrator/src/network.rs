use crate::error::{self, Result};
use crate::executor::{CommandExecutor, ExecCommand};
use log::debug;
use snafu::OptionExt;
use std::net::Ipv4Addr;

/// Reads the first IPv4 address assigned to `interface` on the local host.
pub(crate) async fn resolve_ipv4<E: CommandExecutor>(
    executor: &E,
    interface: &str,
) -> Result<Ipv4Addr> {
    let command = ExecCommand::new("ip")
        .args(["-o", "-4", "addr", "show", "dev", interface])
        .capture();
    let output = match executor.execute(&command).await {
        Ok(output) => output,
        Err(e) => {
            return error::NetworkConfigSnafu {
                interface,
                reason: e.to_string(),
            }
            .fail()
        }
    };
    if !output.success() {
        return error::NetworkConfigSnafu {
            interface,
            reason: format!("'ip' exited with {}", output.exit_code),
        }
        .fail();
    }
    let address = parse_ipv4(&output.stdout).context(error::NetworkConfigSnafu {
        interface,
        reason: "no IPv4 address assigned",
    })?;
    debug!("Using {} from interface {}", address, interface);
    Ok(address)
}

/// Finds the first `inet a.b.c.d/nn` entry in `ip -o -4 addr` output.
pub(crate) fn parse_ipv4(output: &str) -> Option<Ipv4Addr> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        fields.find(|field| *field == "inet")?;
        let cidr = fields.next()?;
        cidr.split('/').next()?.parse().ok()
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_address_wins() {
        let output = concat!(
            "2: eth0    inet 10.0.0.5/24 brd 10.0.0.255 scope global eth0\\",
            "       valid_lft forever preferred_lft forever\n",
            "2: eth0    inet 10.0.0.6/24 scope global secondary eth0\\",
            "       valid_lft forever preferred_lft forever\n",
        );
        assert_eq!(parse_ipv4(output), Some(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[test]
    fn no_address() {
        assert_eq!(parse_ipv4(""), None);
        assert_eq!(parse_ipv4("2: eth0    inet6 fe80::1/64 scope link"), None);
    }
}
