//! An in-process kernel.
//!
//! [`HostKernel`] implements the [`Kernel`] surface entirely in memory:
//! a device-number namespace, a class/device registry that materializes
//! addressable nodes, and a VFS dispatch table that routes [`open`] calls to
//! registered [`FileOperations`]. Tests drive drivers through it and audit
//! their registry interactions via the event journal, optionally forcing
//! individual services to fail.
//!
//! [`open`]: HostKernel::open

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    device::{ClassHandle, DevId, NodeHandle},
    error::{linux_err::*, KernelResult},
    kernel::{File, FileOperations, Kernel, OpenFlags},
    uaccess::{UserSliceReader, UserSliceWriter},
};

bitflags::bitflags! {
    /// Services the host kernel can be told to fail, for exercising a
    /// driver's partial-initialization paths.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct FaultSet: u32 {
        const ALLOC_REGION = 1 << 0;
        const CLASS_CREATE = 1 << 1;
        const DEVICE_CREATE = 1 << 2;
        const CDEV_ADD = 1 << 3;
    }
}

/// One registry interaction, in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    RegionAllocated { base: DevId, count: u32, name: String },
    RegionReleased { base: DevId, count: u32 },
    ClassCreated { name: String },
    ClassDestroyed { name: String },
    NodeCreated { name: String, id: DevId },
    NodeDestroyed { name: String },
    CdevAdded { base: DevId, count: u32 },
    CdevRemoved { base: DevId },
}

struct Region {
    name: String,
    count: u32,
}

struct Node {
    name: String,
    id: DevId,
}

struct DispatchEntry {
    base: DevId,
    count: u32,
    fops: Arc<dyn FileOperations>,
}

impl DispatchEntry {
    fn covers(&self, id: DevId) -> bool {
        id.major() == self.base.major()
            && id.minor() >= self.base.minor()
            && id.minor() < self.base.minor() + self.count
    }
}

#[derive(Default)]
struct Inner {
    next_major: u32,
    next_handle: u64,
    regions: HashMap<u32, Region>,
    classes: HashMap<u64, String>,
    nodes: HashMap<u64, Node>,
    dispatch: Vec<DispatchEntry>,
    faults: FaultSet,
    journal: Vec<Event>,
}

/// The in-memory kernel. Cheap to construct per test; every instance has its
/// own namespace, registry, and journal.
pub struct HostKernel {
    inner: Mutex<Inner>,
}

impl HostKernel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                // First dynamically allocated major, as on a quiet system.
                next_major: 240,
                faults: FaultSet::empty(),
                ..Inner::default()
            }),
        })
    }

    /// Makes the named services fail until cleared.
    pub fn inject(&self, faults: FaultSet) {
        self.lock().faults = faults;
    }

    pub fn clear_faults(&self) {
        self.lock().faults = FaultSet::empty();
    }

    /// Snapshot of every registry interaction so far.
    pub fn journal(&self) -> Vec<Event> {
        self.lock().journal.clone()
    }

    /// Opens the device node named `name`, dispatching to the driver that
    /// registered for its identity.
    pub fn open(&self, name: &str, flags: OpenFlags) -> KernelResult<OpenFile> {
        let (fops, file) = {
            let inner = self.lock();
            let node = inner
                .nodes
                .values()
                .find(|node| node.name == name)
                .ok_or(ENOENT)?;
            let entry = inner
                .dispatch
                .iter()
                .find(|entry| entry.covers(node.id))
                .ok_or(ENXIO)?;
            (entry.fops.clone(), File::new(flags))
        };
        fops.open(&file)?;
        Ok(OpenFile {
            fops,
            file,
            pos: 0,
        })
    }

    /// Delivers a load event to `M`, handing it this kernel's services.
    pub fn load_module<M: crate::kernel::Module>(self: &Arc<Self>) -> KernelResult<M> {
        M::init(self.clone() as Arc<dyn Kernel>)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("host kernel state poisoned")
    }
}

impl Kernel for HostKernel {
    fn alloc_chrdev_region(&self, name: &str, count: u32) -> KernelResult<DevId> {
        let mut inner = self.lock();
        if inner.faults.contains(FaultSet::ALLOC_REGION) {
            return Err(EBUSY);
        }
        if inner.regions.values().any(|region| region.name == name) {
            return Err(EEXIST);
        }
        let major = inner.next_major;
        inner.next_major += 1;
        inner.regions.insert(
            major,
            Region {
                name: name.to_owned(),
                count,
            },
        );
        let base = DevId::new(major, 0);
        inner.journal.push(Event::RegionAllocated {
            base,
            count,
            name: name.to_owned(),
        });
        Ok(base)
    }

    fn unregister_chrdev_region(&self, base: DevId, count: u32) {
        let mut inner = self.lock();
        match inner.regions.remove(&base.major()) {
            Some(region) => {
                if region.count != count {
                    log::warn!(
                        "region {:?} released with span {}, allocated with {}",
                        base,
                        count,
                        region.count
                    );
                }
                inner.journal.push(Event::RegionReleased { base, count });
            }
            None => log::warn!("release of unknown chrdev region {:?}", base),
        }
    }

    fn class_create(&self, name: &str) -> KernelResult<ClassHandle> {
        let mut inner = self.lock();
        if inner.faults.contains(FaultSet::CLASS_CREATE) {
            return Err(ENOMEM);
        }
        if inner.classes.values().any(|class| class == name) {
            return Err(EEXIST);
        }
        inner.next_handle += 1;
        let handle = ClassHandle(inner.next_handle);
        inner.classes.insert(handle.0, name.to_owned());
        inner.journal.push(Event::ClassCreated {
            name: name.to_owned(),
        });
        Ok(handle)
    }

    fn class_destroy(&self, class: ClassHandle) {
        let mut inner = self.lock();
        match inner.classes.remove(&class.0) {
            Some(name) => inner.journal.push(Event::ClassDestroyed { name }),
            None => log::warn!("destroy of unknown class {:?}", class),
        }
    }

    fn device_create(&self, class: ClassHandle, id: DevId, name: &str) -> KernelResult<NodeHandle> {
        let mut inner = self.lock();
        if inner.faults.contains(FaultSet::DEVICE_CREATE) {
            return Err(ENOMEM);
        }
        if !inner.classes.contains_key(&class.0) {
            return Err(ENODEV);
        }
        if inner.nodes.values().any(|node| node.name == name) {
            return Err(EEXIST);
        }
        inner.next_handle += 1;
        let handle = NodeHandle(inner.next_handle);
        inner.nodes.insert(
            handle.0,
            Node {
                name: name.to_owned(),
                id,
            },
        );
        inner.journal.push(Event::NodeCreated {
            name: name.to_owned(),
            id,
        });
        Ok(handle)
    }

    fn device_destroy(&self, node: NodeHandle) {
        let mut inner = self.lock();
        match inner.nodes.remove(&node.0) {
            Some(node) => inner.journal.push(Event::NodeDestroyed { name: node.name }),
            None => log::warn!("destroy of unknown device node {:?}", node),
        }
    }

    fn cdev_add(&self, base: DevId, count: u32, fops: Arc<dyn FileOperations>) -> KernelResult {
        let mut inner = self.lock();
        if inner.faults.contains(FaultSet::CDEV_ADD) {
            return Err(EBUSY);
        }
        let overlaps = inner.dispatch.iter().any(|entry| {
            (0..count).any(|offset| entry.covers(base.with_offset(offset)))
        });
        if overlaps {
            return Err(EBUSY);
        }
        inner.dispatch.push(DispatchEntry { base, count, fops });
        inner.journal.push(Event::CdevAdded { base, count });
        Ok(())
    }

    fn cdev_del(&self, base: DevId) {
        let mut inner = self.lock();
        match inner.dispatch.iter().position(|entry| entry.base == base) {
            Some(index) => {
                inner.dispatch.remove(index);
                inner.journal.push(Event::CdevRemoved { base });
            }
            None => log::warn!("cdev_del of unregistered base {:?}", base),
        }
    }
}

/// An open session against a published node.
///
/// Maintains the file cursor and hands it to the driver on every read and
/// write; the driver decides whether to advance it.
pub struct OpenFile {
    fops: Arc<dyn FileOperations>,
    file: File,
    pos: u64,
}

impl OpenFile {
    /// Reads up to `len` bytes at the current cursor.
    pub fn read(&mut self, len: usize) -> KernelResult<Vec<u8>> {
        let mut storage = vec![0u8; len];
        let mut writer = UserSliceWriter::new(&mut storage);
        let copied = self.fops.read(&self.file, &mut writer, &mut self.pos)?;
        storage.truncate(copied);
        Ok(storage)
    }

    /// Writes `data` at the current cursor, returning the accepted length.
    pub fn write(&mut self, data: &[u8]) -> KernelResult<usize> {
        let mut reader = UserSliceReader::new(data);
        self.fops.write(&self.file, &mut reader, &mut self.pos)
    }

    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        if self.fops.release(&self.file).is_err() {
            log::warn!("release failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl FileOperations for Echo {
        fn read(
            &self,
            _file: &File,
            buf: &mut UserSliceWriter<'_>,
            offset: &mut u64,
        ) -> KernelResult<usize> {
            let data = b"echo";
            let start = (*offset as usize).min(data.len());
            let len = buf.len().min(data.len() - start);
            buf.write(&data[start..start + len])?;
            *offset += len as u64;
            Ok(len)
        }
    }

    fn published(kernel: &Arc<HostKernel>) -> DevId {
        let base = kernel.alloc_chrdev_region("echo", 1).unwrap();
        let class = kernel.class_create("echo").unwrap();
        kernel.device_create(class, base, "echo0").unwrap();
        kernel.cdev_add(base, 1, Arc::new(Echo)).unwrap();
        base
    }

    #[test]
    fn allocates_distinct_majors() {
        let kernel = HostKernel::new();
        let a = kernel.alloc_chrdev_region("a", 1).unwrap();
        let b = kernel.alloc_chrdev_region("b", 1).unwrap();
        assert_ne!(a.major(), b.major());
    }

    #[test]
    fn duplicate_region_name_collides() {
        let kernel = HostKernel::new();
        kernel.alloc_chrdev_region("dup", 1).unwrap();
        assert_eq!(kernel.alloc_chrdev_region("dup", 1), Err(EEXIST));
    }

    #[test]
    fn injected_faults_fail_the_named_service() {
        let kernel = HostKernel::new();
        kernel.inject(FaultSet::ALLOC_REGION | FaultSet::CLASS_CREATE);
        assert_eq!(kernel.alloc_chrdev_region("x", 1), Err(EBUSY));
        assert_eq!(kernel.class_create("x"), Err(ENOMEM));
        kernel.clear_faults();
        assert!(kernel.alloc_chrdev_region("x", 1).is_ok());
    }

    #[test]
    fn open_routes_to_registered_fops() {
        let kernel = HostKernel::new();
        published(&kernel);
        let mut file = kernel.open("echo0", OpenFlags::READ).unwrap();
        assert_eq!(file.read(10).unwrap(), b"echo");
        // Cursor advanced; next read is at end.
        assert_eq!(file.read(10).unwrap(), b"");
    }

    #[test]
    fn open_of_unknown_node_fails() {
        let kernel = HostKernel::new();
        assert!(matches!(kernel.open("nope", OpenFlags::READ), Err(e) if e == ENOENT));
    }

    #[test]
    fn open_without_dispatch_entry_fails() {
        let kernel = HostKernel::new();
        let base = kernel.alloc_chrdev_region("silent", 1).unwrap();
        let class = kernel.class_create("silent").unwrap();
        kernel.device_create(class, base, "silent0").unwrap();
        assert!(matches!(kernel.open("silent0", OpenFlags::READ), Err(e) if e == ENXIO));
    }

    #[test]
    fn teardown_is_journaled_once() {
        let kernel = HostKernel::new();
        let base = published(&kernel);
        kernel.cdev_del(base);
        kernel.cdev_del(base); // unknown now; must not journal again
        let removed = kernel
            .journal()
            .into_iter()
            .filter(|event| matches!(event, Event::CdevRemoved { .. }))
            .count();
        assert_eq!(removed, 1);
    }
}
