//! Position-indexed byte codec over a region
//!
//! All multi-byte values are little-endian. Offsets are region-local;
//! heap addresses must be translated first (`address - region.base()`).
//!
//! The `read_*`/`write_*` names mirror the guest language's numeric
//! types rather than the host's: `read_u8` reads the guest's uint8.
//! `new_*` variants additionally advance the bump counter by the
//! width written; `write_*` never touch the counter and are the
//! primitive for in-place updates of existing monos.

use std::ptr;

use super::error::HeapError;
use super::region::{Region, REGION_SIZE};
use super::{Address, Offset, STORED_ADDRESS_SIZE};

impl<'heap> Region<'heap> {
    /// Bounds-check an access of `len` bytes at `at`, returning a raw
    /// pointer to the first byte.
    fn check(&self, at: Offset, len: Offset) -> Result<*mut u8, HeapError> {
        match at.checked_add(len) {
            Some(end) if end <= REGION_SIZE => {
                Ok(unsafe { self.data.as_ptr().add(at as usize) })
            }
            _ => Err(HeapError::OutOfRange {
                at: u64::from(at),
                limit: u64::from(REGION_SIZE),
            }),
        }
    }

    fn read_bytes<const N: usize>(&self, at: Offset) -> Result<[u8; N], HeapError> {
        let src = self.check(at, N as Offset)?;
        let mut buf = [0u8; N];
        unsafe { ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), N) };
        Ok(buf)
    }

    fn write_bytes<const N: usize>(&self, at: Offset, bytes: [u8; N]) -> Result<(), HeapError> {
        let dest = self.check(at, N as Offset)?;
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dest, N) };
        Ok(())
    }

    pub fn read_u8(&self, at: Offset) -> Result<u8, HeapError> {
        Ok(self.read_bytes::<1>(at)?[0])
    }

    pub fn read_byte(&self, at: Offset) -> Result<u8, HeapError> {
        self.read_u8(at)
    }

    pub fn read_u32(&self, at: Offset) -> Result<u32, HeapError> {
        Ok(u32::from_le_bytes(self.read_bytes(at)?))
    }

    pub fn read_u64(&self, at: Offset) -> Result<u64, HeapError> {
        Ok(u64::from_le_bytes(self.read_bytes(at)?))
    }

    /// Stored pointers are 4 bytes wide by convention; widen to the
    /// in-memory address type on the way out.
    pub fn read_address(&self, at: Offset) -> Result<Address, HeapError> {
        Ok(Address::from(self.read_u32(at)?))
    }

    pub fn read_i8(&self, at: Offset) -> Result<i8, HeapError> {
        Ok(self.read_bytes::<1>(at)?[0] as i8)
    }

    pub fn read_i32(&self, at: Offset) -> Result<i32, HeapError> {
        Ok(i32::from_le_bytes(self.read_bytes(at)?))
    }

    pub fn read_f32(&self, at: Offset) -> Result<f32, HeapError> {
        Ok(f32::from_le_bytes(self.read_bytes(at)?))
    }

    pub fn read_f64(&self, at: Offset) -> Result<f64, HeapError> {
        Ok(f64::from_le_bytes(self.read_bytes(at)?))
    }

    pub fn write_u8(&self, at: Offset, value: u8) -> Result<(), HeapError> {
        self.write_bytes(at, [value])
    }

    pub fn write_byte(&self, at: Offset, value: u8) -> Result<(), HeapError> {
        self.write_u8(at, value)
    }

    pub fn write_u32(&self, at: Offset, value: u32) -> Result<(), HeapError> {
        self.write_bytes(at, value.to_le_bytes())
    }

    pub fn write_u64(&self, at: Offset, value: u64) -> Result<(), HeapError> {
        self.write_bytes(at, value.to_le_bytes())
    }

    /// Store an address in the 4-byte pointer format, validating that
    /// it fits the stored width.
    pub fn write_address(&self, at: Offset, address: Address) -> Result<(), HeapError> {
        if address > Address::from(u32::MAX) {
            return Err(HeapError::OutOfRange {
                at: address,
                limit: (1u64 << (STORED_ADDRESS_SIZE * 8)) - 1,
            });
        }
        self.write_u32(at, address as u32)
    }

    pub fn write_i8(&self, at: Offset, value: i8) -> Result<(), HeapError> {
        self.write_bytes(at, [value as u8])
    }

    pub fn write_i32(&self, at: Offset, value: i32) -> Result<(), HeapError> {
        self.write_bytes(at, value.to_le_bytes())
    }

    pub fn write_f32(&self, at: Offset, value: f32) -> Result<(), HeapError> {
        self.write_bytes(at, value.to_le_bytes())
    }

    pub fn write_f64(&self, at: Offset, value: f64) -> Result<(), HeapError> {
        self.write_bytes(at, value.to_le_bytes())
    }

    fn bump(&self, width: Offset) -> Result<(), HeapError> {
        let counter = self.counter()?;
        self.set_counter(counter + width)
    }

    pub fn new_u8(&self, at: Offset, value: u8) -> Result<(), HeapError> {
        self.write_u8(at, value)?;
        self.bump(1)
    }

    pub fn new_byte(&self, at: Offset, value: u8) -> Result<(), HeapError> {
        self.new_u8(at, value)
    }

    pub fn new_u32(&self, at: Offset, value: u32) -> Result<(), HeapError> {
        self.write_u32(at, value)?;
        self.bump(4)
    }

    pub fn new_u64(&self, at: Offset, value: u64) -> Result<(), HeapError> {
        self.write_u64(at, value)?;
        self.bump(8)
    }

    pub fn new_address(&self, at: Offset, address: Address) -> Result<(), HeapError> {
        self.write_address(at, address)?;
        self.bump(STORED_ADDRESS_SIZE)
    }

    pub fn new_i8(&self, at: Offset, value: i8) -> Result<(), HeapError> {
        self.write_i8(at, value)?;
        self.bump(1)
    }

    pub fn new_i32(&self, at: Offset, value: i32) -> Result<(), HeapError> {
        self.write_i32(at, value)?;
        self.bump(4)
    }

    pub fn new_f32(&self, at: Offset, value: f32) -> Result<(), HeapError> {
        self.write_f32(at, value)?;
        self.bump(4)
    }

    pub fn new_f64(&self, at: Offset, value: f64) -> Result<(), HeapError> {
        self.write_f64(at, value)?;
        self.bump(8)
    }
}

#[cfg(test)]
pub mod tests {

    use super::*;
    use crate::memory::heap::Heap;
    use crate::memory::region::REGION_HEADER_SIZE;

    #[test]
    pub fn test_scalar_round_trips() {
        let heap = Heap::new();
        let region = heap.new_region().unwrap();

        region.write_u8(100, 0xAB).unwrap();
        assert_eq!(region.read_u8(100).unwrap(), 0xAB);

        region.write_u32(104, 0xDEAD_BEEF).unwrap();
        assert_eq!(region.read_u32(104).unwrap(), 0xDEAD_BEEF);

        region.write_u64(112, u64::MAX - 7).unwrap();
        assert_eq!(region.read_u64(112).unwrap(), u64::MAX - 7);

        region.write_i8(120, -100).unwrap();
        assert_eq!(region.read_i8(120).unwrap(), -100);

        region.write_i32(124, -1025).unwrap();
        assert_eq!(region.read_i32(124).unwrap(), -1025);

        region.write_f32(128, 1.5).unwrap();
        assert_eq!(region.read_f32(128).unwrap(), 1.5);

        region.write_f64(132, -2.875).unwrap();
        assert_eq!(region.read_f64(132).unwrap(), -2.875);
    }

    #[test]
    pub fn test_little_endian_layout() {
        let heap = Heap::new();
        let region = heap.new_region().unwrap();
        region.write_u32(200, 0x0102_0304).unwrap();
        assert_eq!(region.read_u8(200).unwrap(), 0x04);
        assert_eq!(region.read_u8(201).unwrap(), 0x03);
        assert_eq!(region.read_u8(202).unwrap(), 0x02);
        assert_eq!(region.read_u8(203).unwrap(), 0x01);
    }

    #[test]
    pub fn test_out_of_range() {
        let heap = Heap::new();
        let region = heap.new_region().unwrap();
        assert!(matches!(
            region.read_u32(REGION_SIZE - 3),
            Err(HeapError::OutOfRange { .. })
        ));
        assert!(matches!(
            region.write_f64(REGION_SIZE - 7, 0.0),
            Err(HeapError::OutOfRange { .. })
        ));
        // the last in-range single byte
        assert_eq!(region.read_u8(REGION_SIZE - 1).unwrap(), 0);
    }

    #[test]
    pub fn test_address_round_trip_and_width() {
        let heap = Heap::new();
        let region = heap.new_region().unwrap();
        region.write_address(300, 0x00FF_FFFF).unwrap();
        assert_eq!(region.read_address(300).unwrap(), 0x00FF_FFFF);
        assert!(matches!(
            region.write_address(300, 0x1_0000_0000),
            Err(HeapError::OutOfRange { .. })
        ));
    }

    #[test]
    pub fn test_new_variants_advance_counter() {
        let heap = Heap::new();
        let region = heap.new_region().unwrap();
        let start = region.counter().unwrap();
        assert_eq!(start, REGION_HEADER_SIZE);
        region.new_u8(start, 7).unwrap();
        assert_eq!(region.counter().unwrap(), start + 1);
        region.new_i32(start + 1, -9).unwrap();
        assert_eq!(region.counter().unwrap(), start + 5);
        region.new_f64(start + 5, 3.5).unwrap();
        assert_eq!(region.counter().unwrap(), start + 13);
        // writes never touch the counter
        region.write_u32(start + 13, 11).unwrap();
        assert_eq!(region.counter().unwrap(), start + 13);
    }
}
