//! Record storage over a raw block device
//!
//! A record is a magic header followed by an encoded payload. Anything that
//! does not start with the header (erased flash, a torn write) reads as
//! [`StorageError::InvalidMagicHeader`].

const MAGIC_HEADER: u16 = 0xBEEF;
pub const MAGIC_HEADER_SIZE: usize = MAGIC_HEADER.to_le_bytes().len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    DriverError,
    InvalidMagicHeader,
    InvalidData,
    /// Encoded payload does not fit the storage block
    Overflow,
}

/// A value with a compact binary representation.
pub trait Encodable
where
    Self: Sized,
{
    /// Writes the value into `buffer`, returning the number of bytes used.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, StorageError>;
    fn decode(data: &[u8]) -> Option<Self>;
}

/// Raw access to one storage block of `STORAGE_SIZE` bytes.
pub trait StorageDriver<const STORAGE_SIZE: usize> {
    fn read(&self, buffer: &mut [u8]) -> Result<(), StorageError>;
    /// Replaces the whole block with `buffer`.
    fn write(&self, buffer: &[u8]) -> Result<(), StorageError>;
}

/// Persistent storage implementation using a storage driver.
pub struct PersistentStorage<DRIVER: StorageDriver<STORAGE_SIZE>, const STORAGE_SIZE: usize> {
    driver: DRIVER,
}

impl<DRIVER: StorageDriver<STORAGE_SIZE>, const STORAGE_SIZE: usize>
    PersistentStorage<DRIVER, STORAGE_SIZE>
{
    pub fn new(driver: DRIVER) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &DRIVER {
        &self.driver
    }

    /// Load a record from the block
    pub fn load<T: Encodable>(&self) -> Result<T, StorageError> {
        let mut buffer = [0u8; STORAGE_SIZE];
        self.driver
            .read(&mut buffer)
            .map_err(|_| StorageError::DriverError)?;

        let magic = u16::from_le_bytes([buffer[0], buffer[1]]);
        if magic != MAGIC_HEADER {
            return Err(StorageError::InvalidMagicHeader);
        }
        T::decode(&buffer[MAGIC_HEADER_SIZE..]).ok_or(StorageError::InvalidData)
    }

    /// Save a record to the block
    pub fn save<T: Encodable>(&self, value: &T) -> Result<(), StorageError> {
        let mut data = [0xFFu8; STORAGE_SIZE];

        data[0..MAGIC_HEADER_SIZE].copy_from_slice(&MAGIC_HEADER.to_le_bytes());
        value.encode(&mut data[MAGIC_HEADER_SIZE..])?;

        self.driver
            .write(&data)
            .map_err(|_| StorageError::DriverError)
    }
}
