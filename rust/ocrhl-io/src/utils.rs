pub mod byte_channel;

/// Fails with `InvalidInput` when the predicate does not hold.
#[macro_export]
macro_rules! verify {
    ($expr:expr) => {{
        let result = $expr;
        $crate::utils::verify(result, stringify!($expr))?;
    }};
}

pub fn verify(predicate: bool, condition: &str) -> std::io::Result<()> {
    if !predicate {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("check failed: {condition}"),
        ));
    }
    Ok(())
}
