pub use http::StatusCode;

/// Extracts the HTTP status of a failed API call so callers can tell a missing object from other
/// failures.
pub trait HttpStatusCode {
    fn status_code(&self) -> Option<StatusCode>;

    fn is_status_code(&self, status_code: StatusCode) -> bool {
        self.status_code()
            .map(|some| some == status_code)
            .unwrap_or_default()
    }

    fn is_not_found(&self) -> bool {
        self.is_status_code(StatusCode::NOT_FOUND)
    }
}

impl HttpStatusCode for kube::Error {
    fn status_code(&self) -> Option<StatusCode> {
        if let kube::Error::Api(error_response) = self {
            StatusCode::from_u16(error_response.code).ok()
        } else {
            None
        }
    }
}

impl<T, E> HttpStatusCode for std::result::Result<T, E>
where
    E: HttpStatusCode,
{
    fn status_code(&self) -> Option<StatusCode> {
        self.as_ref().err().and_then(|e| e.status_code())
    }
}
