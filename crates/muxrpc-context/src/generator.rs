//! Correlation id generation.

/// Produces correlation ids for contexts created without one.
///
/// Any `Fn() -> String` closure is a generator, which is how tests pin the
/// id to a known value.
pub trait CorrelationIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> CorrelationIdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Random UUID v4 rendered as 32 lowercase hex digits, no dashes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl CorrelationIdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}
