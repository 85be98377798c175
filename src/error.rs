/// Status returned by every bus operation.
///
/// The plain variants follow the status codes of an SPI master driver; `Bus`
/// carries the transfer error of the underlying host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// A parameter is out of range or inconsistent
    InvalidArg,
    /// The bus is in the wrong lifecycle state for the request
    InvalidState,
    /// No free chip-select slot, or the device handle is unknown
    NotFound,
    /// The host could not allocate its driver structures
    NoMem,
    /// The payload length is not acceptable (zero bytes)
    InvalidSize,
    /// The transfer failed on the wire
    Bus(E),
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;

impl<E> core::fmt::Display for Error<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Error::InvalidArg => write!(f, "invalid argument"),
            Error::InvalidState => write!(f, "invalid state"),
            Error::NotFound => write!(f, "not found"),
            Error::NoMem => write!(f, "out of memory"),
            Error::InvalidSize => write!(f, "invalid size"),
            Error::Bus(err) => write!(f, "Bus error: {:?}", err),
        }
    }
}

impl<E> core::error::Error for Error<E> where E: core::fmt::Debug {}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::Bus(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_wraps_bus_error() {
        let err: Error<&str> = "timeout".into();
        assert_eq!(err, Error::Bus("timeout"));
        assert_eq!(format!("{}", err), "Bus error: \"timeout\"");
        assert_eq!(format!("{}", Error::<()>::InvalidSize), "invalid size");
    }
}
