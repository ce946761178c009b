use pincode_dom::DomError;

/// Errors surfaced by widget construction and the instance registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PincodeError {
    /// The target selector matched nothing, or the node no longer exists.
    #[error("Element not found")]
    ElementNotFound,
    /// The target exists but is not a text-capable `<input>`.
    #[error("Element must be an input field")]
    NotAnInput,
    /// The instance id is unknown, typically because it was already destroyed.
    #[error("PincodeInput instance not found")]
    InstanceNotFound,
    /// A document operation failed, e.g. the selector could not be parsed.
    #[error(transparent)]
    Dom(#[from] DomError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(PincodeError::ElementNotFound.to_string(), "Element not found");
        assert_eq!(PincodeError::NotAnInput.to_string(), "Element must be an input field");
        assert_eq!(
            PincodeError::InstanceNotFound.to_string(),
            "PincodeInput instance not found"
        );
    }

    #[test]
    fn dom_errors_are_transparent() {
        let dom = DomError::InvalidSelector {
            selector: "#".into(),
            reason: "expected an identifier",
        };
        let err = PincodeError::from(dom.clone());
        assert_eq!(err.to_string(), dom.to_string());
    }
}
