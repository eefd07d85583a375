//! Paged virtual memory (spec §4.3: page size ≥4KiB, page-granular
//! read/write access, segfault on access outside the current layout).
//!
//! Grounded on `pvm-rust/src/simple_ram.rs` and the `Ram` trait in
//! `pvm-rust/src/types.rs`: a flat byte buffer plus a per-page access map,
//! widened here so the page size comes from `jam_types::Params::pvm_page_size`
//! instead of the teacher's hardcoded constant.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAccess {
    None,
    ReadOnly,
    ReadWrite,
}

/// Address the access check faulted on — distinguishes a segfault from a
/// successful read/write for the interpreter's `Terminal::Segfault` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segfault {
    pub address: u32,
}

pub struct Ram {
    page_size: u32,
    memory: Vec<u8>,
    page_access: HashMap<u32, PageAccess>,
    heap_pointer: u32,
    pub last_load_address: Option<u32>,
    pub last_store_address: Option<u32>,
}

impl Ram {
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            memory: Vec::new(),
            page_access: HashMap::new(),
            heap_pointer: 0,
            last_load_address: None,
            last_store_address: None,
        }
    }

    fn page_index(&self, address: u32) -> u32 {
        address / self.page_size
    }

    fn ensure_capacity(&mut self, address: u32, len: usize) {
        let needed = address as usize + len;
        if needed > self.memory.len() {
            self.memory.resize(needed, 0);
        }
    }

    #[must_use]
    pub fn access(&self, address: u32) -> PageAccess {
        self.page_access
            .get(&self.page_index(address))
            .copied()
            .unwrap_or(PageAccess::None)
    }

    pub fn set_page_access(&mut self, page_index: u32, access: PageAccess) {
        self.page_access.insert(page_index, access);
    }

    /// Marks the page range `[start, start+len)` (byte addresses) with
    /// `access`, allocating backing storage for it.
    pub fn init_region(&mut self, start: u32, len: u32, access: PageAccess) {
        self.ensure_capacity(start, len as usize);
        let first_page = self.page_index(start);
        let last_page = if len == 0 {
            first_page
        } else {
            self.page_index(start + len - 1)
        };
        for page in first_page..=last_page {
            self.page_access.insert(page, access);
        }
    }

    pub fn write_during_init(&mut self, address: u32, data: &[u8]) {
        self.ensure_capacity(address, data.len());
        let addr = address as usize;
        self.memory[addr..addr + data.len()].copy_from_slice(data);
    }

    fn check_readable(&self, address: u32, len: usize) -> Result<(), Segfault> {
        if len == 0 {
            return Ok(());
        }
        let first_page = self.page_index(address);
        let last_page = self.page_index(address + len as u32 - 1);
        for page in first_page..=last_page {
            match self.page_access.get(&page) {
                Some(PageAccess::ReadOnly) | Some(PageAccess::ReadWrite) => {}
                _ => return Err(Segfault { address }),
            }
        }
        Ok(())
    }

    fn check_writable(&self, address: u32, len: usize) -> Result<(), Segfault> {
        if len == 0 {
            return Ok(());
        }
        let first_page = self.page_index(address);
        let last_page = self.page_index(address + len as u32 - 1);
        for page in first_page..=last_page {
            match self.page_access.get(&page) {
                Some(PageAccess::ReadWrite) => {}
                _ => return Err(Segfault { address }),
            }
        }
        Ok(())
    }

    pub fn read(&mut self, address: u32, len: usize) -> Result<Vec<u8>, Segfault> {
        self.check_readable(address, len)?;
        self.last_load_address = Some(address);
        let addr = address as usize;
        Ok(self.memory[addr..addr + len].to_vec())
    }

    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Segfault> {
        self.check_writable(address, data.len())?;
        self.last_store_address = Some(address);
        let addr = address as usize;
        self.memory[addr..addr + data.len()].copy_from_slice(data);
        Ok(())
    }

    #[must_use]
    pub fn heap_pointer(&self) -> u32 {
        self.heap_pointer
    }

    pub fn set_heap_pointer(&mut self, value: u32) {
        self.heap_pointer = value;
    }

    /// `sbrk`: grows the heap by `increment` bytes, rounded up to a whole
    /// number of pages, marking the new region read-write.
    pub fn grow_heap(&mut self, increment: u32) -> u32 {
        let prior = self.heap_pointer;
        if increment == 0 {
            return prior;
        }
        let new_top = prior + increment;
        let aligned = align_up(new_top, self.page_size);
        self.init_region(prior, aligned - prior, PageAccess::ReadWrite);
        self.heap_pointer = aligned;
        prior
    }

    pub fn clear_last_access(&mut self) {
        self.last_load_address = None;
        self.last_store_address = None;
    }
}

#[must_use]
fn align_up(value: u32, boundary: u32) -> u32 {
    if boundary == 0 {
        return value;
    }
    let rem = value % boundary;
    if rem == 0 {
        value
    } else {
        value + (boundary - rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_read_segfaults() {
        let mut ram = Ram::new(4096);
        assert_eq!(ram.read(0, 4), Err(Segfault { address: 0 }));
    }

    #[test]
    fn read_only_page_rejects_write() {
        let mut ram = Ram::new(4096);
        ram.init_region(0, 4096, PageAccess::ReadOnly);
        ram.write_during_init(0, &[1, 2, 3, 4]);
        assert_eq!(ram.read(0, 4).unwrap(), vec![1, 2, 3, 4]);
        assert!(ram.write(0, &[9]).is_err());
    }

    #[test]
    fn read_write_page_roundtrips() {
        let mut ram = Ram::new(4096);
        ram.init_region(0, 4096, PageAccess::ReadWrite);
        ram.write(10, &[7, 7, 7]).unwrap();
        assert_eq!(ram.read(10, 3).unwrap(), vec![7, 7, 7]);
    }

    #[test]
    fn grow_heap_rounds_up_to_page_and_marks_writable() {
        let mut ram = Ram::new(4096);
        ram.set_heap_pointer(0);
        let prior = ram.grow_heap(10);
        assert_eq!(prior, 0);
        assert_eq!(ram.heap_pointer(), 4096);
        ram.write(10, &[1]).unwrap();
    }

    #[test]
    fn cross_page_access_requires_every_page_mapped() {
        let mut ram = Ram::new(4096);
        ram.init_region(0, 4096, PageAccess::ReadWrite);
        assert!(ram.write(4094, &[1, 2, 3, 4]).is_err());
    }
}
