//! Tests for error types.

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::path::Path;

    #[test]
    fn test_error_display() {
        let err = Error::config("invalid port");
        assert_eq!(err.to_string(), "configuration error: invalid port");
    }

    #[test]
    fn test_error_internal() {
        let err = Error::internal("bus closed");
        assert_eq!(err.to_string(), "internal error: bus closed");
    }

    #[test]
    fn test_watcher_error_conversion() {
        let watch_err = WatcherError::WatchFailed {
            path: "/tmp/styles".to_string(),
            reason: "permission denied".to_string(),
        };
        let err: Error = watch_err.into();
        assert!(matches!(err, Error::Watcher(_)));
    }

    #[test]
    fn test_server_error_conversion() {
        let server_err = ServerError::BindFailed {
            address: "127.0.0.1:3456".to_string(),
            reason: "address in use".to_string(),
        };
        let err: Error = server_err.into();
        assert!(matches!(err, Error::Server(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_no_free_port_display() {
        let err = ServerError::NoFreePort { start: 3456 };
        assert_eq!(
            err.to_string(),
            "no free port available starting from 3456"
        );
    }

    #[test]
    fn test_remediation_for_exhaustion() {
        let err: Error = WatcherError::ResourceExhausted("ENOSPC".to_string()).into();
        let hint = err.remediation().unwrap();
        assert!(hint.contains("max_user_watches"));
        assert!(hint.contains("--root"));
    }

    #[test]
    fn test_remediation_for_port() {
        let err: Error = ServerError::NoFreePort { start: 65535 }.into();
        assert!(err.remediation().unwrap().contains("--port"));
    }

    #[test]
    fn test_no_remediation_for_internal() {
        assert!(Error::internal("x").remediation().is_none());
    }

    #[test]
    fn test_notify_max_files_is_exhaustion() {
        let err = notify::Error::new(notify::ErrorKind::MaxFilesWatch);
        let classified = WatcherError::from_notify(Path::new("/srv"), &err);
        assert!(matches!(classified, WatcherError::ResourceExhausted(_)));
    }

    #[test]
    fn test_notify_enospc_is_exhaustion() {
        let err = notify::Error::io(std::io::Error::from_raw_os_error(28));
        let classified = WatcherError::from_notify(Path::new("/srv"), &err);
        assert!(matches!(classified, WatcherError::ResourceExhausted(_)));
    }

    #[test]
    fn test_notify_path_not_found_is_watch_failure() {
        let err = notify::Error::path_not_found();
        let classified = WatcherError::from_notify(Path::new("/srv/css"), &err);
        match classified {
            WatcherError::WatchFailed { path, .. } => assert_eq!(path, "/srv/css"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<i32> {
            Err(Error::config("inner error"))
        }

        fn outer() -> Result<i32> {
            let _ = inner()?;
            Ok(0)
        }

        let result = outer();
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "configuration error: inner error"
        );
    }
}
