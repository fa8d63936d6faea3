//! Panic payload rendering for the execution wrapper

use std::any::Any;

/// Render a caught panic payload as a message.
///
/// `panic!` with a literal yields `&str`, with format arguments `String`;
/// anything else (e.g. `std::panic::panic_any`) gets a placeholder.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, panic_any};

    #[test]
    fn test_str_payload() {
        let payload = catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }

    #[test]
    fn test_formatted_payload() {
        let code = 7;
        let payload = catch_unwind(|| panic!("exit code {}", code)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "exit code 7");
    }

    #[test]
    fn test_opaque_payload() {
        let payload = catch_unwind(|| panic_any(42u32)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
