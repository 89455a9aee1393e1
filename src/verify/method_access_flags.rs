use crate::codegen::flag::access_flags;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MethodAccessFlagsError {
    #[error("Invalid method access flags: 0x{0:04x}")]
    Invalid(u16),
}

pub type Result<T> = std::result::Result<T, MethodAccessFlagsError>;

/// Verify method access flags of a class (non-interface) method
pub fn verify(flags: u16) -> Result<()> {
    let public_set = flags & access_flags::ACC_PUBLIC != 0;
    let protected_set = flags & access_flags::ACC_PROTECTED != 0;
    let private_set = flags & access_flags::ACC_PRIVATE != 0;

    if (public_set as u8 + protected_set as u8 + private_set as u8) > 1 {
        return Err(MethodAccessFlagsError::Invalid(flags));
    }

    if flags & access_flags::ACC_ABSTRACT != 0
        && (flags & access_flags::ACC_PRIVATE != 0
            || flags & access_flags::ACC_STATIC != 0
            || flags & access_flags::ACC_FINAL != 0
            || flags & access_flags::ACC_SYNCHRONIZED != 0
            || flags & access_flags::ACC_NATIVE != 0
            || flags & access_flags::ACC_STRICT != 0)
    {
        return Err(MethodAccessFlagsError::Invalid(flags));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use access_flags::*;

    #[test]
    fn test_visibility_is_exclusive() {
        assert!(verify(ACC_PUBLIC).is_ok());
        assert!(verify(0).is_ok());
        assert_eq!(
            verify(ACC_PUBLIC | ACC_PRIVATE),
            Err(MethodAccessFlagsError::Invalid(ACC_PUBLIC | ACC_PRIVATE))
        );
    }

    #[test]
    fn test_abstract_combinations() {
        assert!(verify(ACC_PROTECTED | ACC_ABSTRACT).is_ok());
        assert!(verify(ACC_PRIVATE | ACC_ABSTRACT).is_err());
        assert!(verify(ACC_ABSTRACT | ACC_FINAL).is_err());
    }
}
