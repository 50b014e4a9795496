pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns an `InvalidArgument` error from the enclosing function when the
/// expression evaluates to `false`.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Returns an `InvalidFormat` error from the enclosing function when the
/// expression evaluates to `false`.
#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_format(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::Error::invalid_arg(name, condition))
}

#[cold]
pub fn invalid_format(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::Error::invalid_format(name, condition))
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_capacity(capacity: usize) -> crate::Result<usize> {
        verify_arg!(capacity, capacity.is_power_of_two());
        Ok(capacity)
    }

    fn check_len(len: usize) -> crate::Result<usize> {
        verify_data!(filter_data, len % 32 == 0);
        Ok(len / 32)
    }

    #[test]
    fn test_verify_macros() {
        assert_eq!(check_capacity(64).unwrap(), 64);
        let err = check_capacity(48).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "capacity");
                assert_eq!(message, "capacity.is_power_of_two()");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }

        assert_eq!(check_len(64).unwrap(), 2);
        assert!(matches!(
            check_len(33).unwrap_err().kind(),
            ErrorKind::InvalidFormat { .. }
        ));
    }
}
