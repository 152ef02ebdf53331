// SPDX-License-Identifier: GPL-2.0

//! Driver lifecycle.
//!
//! [`NameDev`] owns every resource the driver holds and is the single state
//! machine of the crate: load walks the fixed creation order (identity →
//! class → node → VFS registration), drop walks the exact reverse. Steps
//! that fail are handled per [`InitPolicy`]; the default keeps the device's
//! historical best-effort behavior, where a failed step is logged and load
//! still completes.

use std::sync::Arc;

use khost::{
    device::{ClassHandle, DevId, NodeHandle},
    kernel::{Kernel, Module},
    Error, KernelResult,
};

use crate::{buffer::NameBuffer, fops::NameDevOps};

/// Name the identity region is tagged with, visible in `/proc/devices`.
pub const DEVICE_NAME: &str = "namedev";
/// Class grouping the node is published under.
pub const CLASS_NAME: &str = "namedev";
/// Name of the published device node.
pub const NODE_NAME: &str = "namedev0";
/// Width of the identity region and of the dispatch registration.
pub const MINOR_COUNT: u32 = 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LifecycleState {
    Unloaded,
    Initializing,
    Active,
    Unloading,
}

/// One step of the fixed initialization order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InitStep {
    AllocateIdentity,
    CreateClass,
    CreateNode,
    RegisterFops,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepPolicy {
    /// Failure aborts the load; already-created resources are rolled back
    /// in reverse order.
    Required,
    /// Failure is logged and load continues without the resource.
    BestEffort,
}

/// Maps each initialization step to how its failure is treated.
///
/// Whether a partially registered device should count as loaded is a policy
/// question, so it is configurable; [`InitPolicy::default`] preserves the
/// device's original log-and-continue behavior.
#[derive(Clone, Copy, Debug)]
pub struct InitPolicy {
    pub allocate_identity: StepPolicy,
    pub create_class: StepPolicy,
    pub create_node: StepPolicy,
    pub register_fops: StepPolicy,
}

impl InitPolicy {
    /// Every step best-effort.
    pub const fn best_effort() -> Self {
        Self {
            allocate_identity: StepPolicy::BestEffort,
            create_class: StepPolicy::BestEffort,
            create_node: StepPolicy::BestEffort,
            register_fops: StepPolicy::BestEffort,
        }
    }

    /// Every step required.
    pub const fn strict() -> Self {
        Self {
            allocate_identity: StepPolicy::Required,
            create_class: StepPolicy::Required,
            create_node: StepPolicy::Required,
            register_fops: StepPolicy::Required,
        }
    }

    pub fn step(&self, step: InitStep) -> StepPolicy {
        match step {
            InitStep::AllocateIdentity => self.allocate_identity,
            InitStep::CreateClass => self.create_class,
            InitStep::CreateNode => self.create_node,
            InitStep::RegisterFops => self.register_fops,
        }
    }
}

impl Default for InitPolicy {
    fn default() -> Self {
        Self::best_effort()
    }
}

/// A required initialization step failed.
#[derive(Debug)]
pub struct InitError {
    pub step: InitStep,
    pub source: Error,
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?} failed: {:?}", self.step, self.source)
    }
}

impl std::error::Error for InitError {}

/// The loaded driver. All device state is owned here; nothing is global.
///
/// Dropping the value is the unload event: resources are destroyed in the
/// exact reverse of creation order, each exactly once, with never-created
/// resources skipped.
pub struct NameDev {
    kernel: Arc<dyn Kernel>,
    region: Option<DevId>,
    class: Option<ClassHandle>,
    node: Option<NodeHandle>,
    registered: Option<DevId>,
    buffer: Arc<NameBuffer>,
    state: LifecycleState,
}

impl core::fmt::Debug for NameDev {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NameDev")
            .field("region", &self.region)
            .field("class", &self.class)
            .field("node", &self.node)
            .field("registered", &self.registered)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl NameDev {
    /// Loads the driver against `kernel`, running the initialization steps
    /// in their fixed order under `policy`.
    ///
    /// A step whose prerequisite resource is missing (possible only under a
    /// best-effort policy) is skipped with a warning; destroying or using a
    /// never-created resource is not attempted anywhere.
    pub fn load(kernel: Arc<dyn Kernel>, policy: InitPolicy) -> Result<Self, InitError> {
        log::info!("loading");
        let mut dev = NameDev {
            kernel,
            region: None,
            class: None,
            node: None,
            registered: None,
            buffer: Arc::new(NameBuffer::new()),
            state: LifecycleState::Initializing,
        };

        match dev.kernel.alloc_chrdev_region(DEVICE_NAME, MINOR_COUNT) {
            Ok(base) => {
                log::info!("major = {}, minor = {}", base.major(), base.minor());
                dev.region = Some(base);
            }
            Err(err) => dev.step_failed(InitStep::AllocateIdentity, err, &policy)?,
        }

        match dev.kernel.class_create(CLASS_NAME) {
            Ok(class) => dev.class = Some(class),
            Err(err) => dev.step_failed(InitStep::CreateClass, err, &policy)?,
        }

        match (dev.class, dev.region) {
            (Some(class), Some(base)) => {
                match dev.kernel.device_create(class, base, NODE_NAME) {
                    Ok(node) => dev.node = Some(node),
                    Err(err) => dev.step_failed(InitStep::CreateNode, err, &policy)?,
                }
            }
            _ => log::warn!("skipping node publication, class or identity missing"),
        }

        match dev.region {
            Some(base) => {
                let fops = Arc::new(NameDevOps::new(dev.buffer.clone()));
                match dev.kernel.cdev_add(base, MINOR_COUNT, fops) {
                    Ok(()) => dev.registered = Some(base),
                    Err(err) => dev.step_failed(InitStep::RegisterFops, err, &policy)?,
                }
            }
            None => log::warn!("skipping VFS registration, identity missing"),
        }

        dev.state = LifecycleState::Active;
        log::info!("active");
        Ok(dev)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The allocated identity, if allocation succeeded.
    pub fn identity(&self) -> Option<DevId> {
        self.region
    }

    fn step_failed(&mut self, step: InitStep, err: Error, policy: &InitPolicy) -> Result<(), InitError> {
        match policy.step(step) {
            StepPolicy::BestEffort => {
                log::warn!("{:?} failed with {:?}, continuing", step, err);
                Ok(())
            }
            // Returning the error drops the partially built driver, which
            // rolls back already-created resources in reverse order.
            StepPolicy::Required => {
                log::error!("{:?} failed with {:?}", step, err);
                Err(InitError { step, source: err })
            }
        }
    }
}

impl Drop for NameDev {
    fn drop(&mut self) {
        self.state = LifecycleState::Unloading;
        log::info!("unloading");
        if let Some(base) = self.registered.take() {
            self.kernel.cdev_del(base);
        }
        if let Some(node) = self.node.take() {
            self.kernel.device_destroy(node);
        }
        if let Some(class) = self.class.take() {
            self.kernel.class_destroy(class);
        }
        if let Some(base) = self.region.take() {
            self.kernel.unregister_chrdev_region(base, MINOR_COUNT);
        }
        self.state = LifecycleState::Unloaded;
        log::info!("unloaded");
    }
}

impl Module for NameDev {
    fn init(kernel: Arc<dyn Kernel>) -> KernelResult<Self> {
        NameDev::load(kernel, InitPolicy::default()).map_err(|err| err.source)
    }
}
