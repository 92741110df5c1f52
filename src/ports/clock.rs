use time::{OffsetDateTime, UtcOffset};

pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;

    /// Offset used to turn instants into calendar days.
    fn local_offset(&self) -> UtcOffset;
}
