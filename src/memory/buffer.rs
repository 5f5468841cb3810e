//! 设备缓冲区 - 独占所有权的定长数组, 释放时自动归还分配器额度

use crate::{error::HashTableError, memory::MemoryAllocator};
use std::{
    alloc::Layout,
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

/// 由某个 [`MemoryAllocator`] 记账的定长数组
pub struct DeviceBuffer<T> {
    data: Box<[T]>,
    layout: Layout,
    allocator: Arc<dyn MemoryAllocator>,
}

impl<T> DeviceBuffer<T> {
    /// 分配 `len` 个元素, 第 `i` 个元素由 `init(i)` 初始化
    pub fn from_fn(
        allocator: &Arc<dyn MemoryAllocator>,
        len: usize,
        init: impl FnMut(usize) -> T,
    ) -> Result<Self, HashTableError> {
        let layout = Layout::array::<T>(len).map_err(|_| HashTableError::AllocationFailed {
            size: len.saturating_mul(std::mem::size_of::<T>()),
            align: std::mem::align_of::<T>(),
        })?;
        allocator.reserve(layout)?;

        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            allocator.release(layout);
            return Err(HashTableError::AllocationFailed {
                size: layout.size(),
                align: layout.align(),
            });
        }
        data.extend((0..len).map(init));

        Ok(Self {
            data: data.into_boxed_slice(),
            layout,
            allocator: Arc::clone(allocator),
        })
    }

    /// 分配并以同一个值填充
    pub fn filled(allocator: &Arc<dyn MemoryAllocator>, len: usize, value: T) -> Result<Self, HashTableError>
    where
        T: Clone,
    {
        Self::from_fn(allocator, len, |_| value.clone())
    }

    /// 占用字节数
    pub fn size_in_bytes(&self) -> usize {
        self.layout.size()
    }
}

impl<T> Deref for DeviceBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for DeviceBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.allocator.release(self.layout);
    }
}

impl<T> fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.data.len())
            .field("bytes", &self.layout.size())
            .finish()
    }
}
