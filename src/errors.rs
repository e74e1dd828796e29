use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldError
{
    EmptyCloud,
    MalformedCloud,
    EmptyField,
    TimeOutOfRange,
    NonMonotonicTime,
    CorrespondenceCountMismatch,
    ValueCountMismatch
}
impl std::error::Error for FieldError {}

impl Display for FieldError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", *self)
    }
}
