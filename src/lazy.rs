//! Deferred, chunked arrays.
//!
//! A `LazyArray` is a node in an immutable computation graph: either a ready
//! array or a thunk closing over its parent nodes. Nothing is evaluated until
//! `compute` is called; the result is cached in the node, so every handle
//! sharing the node sees a single evaluation.
//!
//! Blockwise kernels split the flattened ensemble dimensions into chunks of
//! `chunk_len` items and evaluate the chunks in parallel with rayon. Kernels
//! operate item by item, so results never depend on the chunk length.

use crate::error::{MeasurementError, Result};
use crate::select::{Resolved, Selector};
use log::debug;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use rayon::prelude::*;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Default number of ensemble items per chunk.
pub const DEFAULT_CHUNK_LEN: usize = 16;

/// Kernel applied to one block of shape `(items, base...)`.
pub type BlockFn<T, U> = dyn Fn(ArrayViewD<'_, T>) -> ArrayD<U> + Send + Sync;

type Thunk<T> = Box<dyn Fn() -> ArrayD<T> + Send + Sync>;

/// Whether a handle owns its data or aliases another handle's node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayOwnership {
    Owned,
    View,
}

enum Node<T> {
    Ready(ArrayD<T>),
    Deferred {
        cell: OnceLock<ArrayD<T>>,
        thunk: Thunk<T>,
    },
}

pub struct LazyArray<T> {
    shape: Vec<usize>,
    chunk_len: usize,
    ownership: ArrayOwnership,
    node: Arc<Node<T>>,
}

impl<T> fmt::Debug for LazyArray<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArray")
            .field("shape", &self.shape)
            .field("chunk_len", &self.chunk_len)
            .field("ownership", &self.ownership)
            .field("computed", &self.is_computed())
            .finish()
    }
}

impl<T> LazyArray<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn from_array(array: ArrayD<T>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            chunk_len: DEFAULT_CHUNK_LEN,
            ownership: ArrayOwnership::Owned,
            node: Arc::new(Node::Ready(array)),
        }
    }

    /// Deferred node; `thunk` must produce an array of exactly `shape`.
    pub fn deferred<F>(shape: Vec<usize>, chunk_len: usize, thunk: F) -> Self
    where
        F: Fn() -> ArrayD<T> + Send + Sync + 'static,
    {
        Self {
            shape,
            chunk_len: chunk_len.max(1),
            ownership: ArrayOwnership::Owned,
            node: Arc::new(Node::Deferred {
                cell: OnceLock::new(),
                thunk: Box::new(thunk),
            }),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    pub fn ownership(&self) -> ArrayOwnership {
        self.ownership
    }

    pub fn is_view(&self) -> bool {
        self.ownership == ArrayOwnership::View
    }

    pub fn is_computed(&self) -> bool {
        match &*self.node {
            Node::Ready(_) => true,
            Node::Deferred { cell, .. } => cell.get().is_some(),
        }
    }

    /// Evaluate the graph up to this node (once) and borrow the result.
    pub fn compute(&self) -> &ArrayD<T> {
        match &*self.node {
            Node::Ready(array) => array,
            Node::Deferred { cell, thunk } => cell.get_or_init(|| thunk()),
        }
    }

    /// Handle aliasing this node.
    pub fn view(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            chunk_len: self.chunk_len,
            ownership: ArrayOwnership::View,
            node: Arc::clone(&self.node),
        }
    }

    /// Handle to an independent node holding a copy of the data.
    pub fn deep_copy(&self) -> Self {
        if self.is_computed() {
            let mut copy = Self::from_array(self.compute().clone());
            copy.chunk_len = self.chunk_len;
            return copy;
        }
        let parent = self.view();
        Self::deferred(self.shape.clone(), self.chunk_len, move || {
            parent.compute().clone()
        })
    }

    /// Evaluate now; the returned handle shares the evaluated node.
    pub fn materialize(&self) -> Self {
        self.compute();
        Self {
            shape: self.shape.clone(),
            chunk_len: self.chunk_len,
            ownership: self.ownership,
            node: Arc::clone(&self.node),
        }
    }

    pub fn rechunk(&self, chunk_len: usize) -> Self {
        let mut handle = self.view();
        handle.chunk_len = chunk_len.max(1);
        handle
    }

    /// Whole-array deferred transform.
    pub fn map<U, F>(&self, out_shape: Vec<usize>, f: F) -> LazyArray<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&ArrayD<T>) -> ArrayD<U> + Send + Sync + 'static,
    {
        let parent = self.view();
        LazyArray::deferred(out_shape, self.chunk_len, move || f(parent.compute()))
    }

    /// Apply `f` chunk by chunk over the flattened ensemble dimensions.
    ///
    /// The trailing `num_base` dimensions are handed to `f` intact as a block of
    /// shape `(items, base...)`; `f` must return `(items, out_base...)`.
    pub fn map_blocks<U>(
        &self,
        num_base: usize,
        out_base_shape: Vec<usize>,
        f: Arc<BlockFn<T, U>>,
    ) -> Result<LazyArray<U>>
    where
        U: Clone + Send + Sync + 'static,
    {
        if num_base > self.ndim() {
            return Err(MeasurementError::AxesMismatch(format!(
                "cannot map {num_base} base dimensions over an array of rank {}",
                self.ndim()
            )));
        }
        let split = self.ndim() - num_base;
        let ensemble_shape = self.shape[..split].to_vec();
        let base_shape = self.shape[split..].to_vec();
        let items: usize = ensemble_shape.iter().product();

        let mut out_shape = ensemble_shape;
        out_shape.extend(out_base_shape.iter().copied());

        let parent = self.view();
        let chunk_len = self.chunk_len;
        let result_shape = out_shape.clone();
        Ok(LazyArray::deferred(out_shape, chunk_len, move || {
            let data = parent.compute();
            let mut flat_shape = vec![items];
            flat_shape.extend(base_shape.iter().copied());
            let standard = data.as_standard_layout();
            let flat = standard
                .view()
                .into_shape(IxDyn(&flat_shape))
                .expect("standard layout arrays reshape without copying");

            let starts: Vec<usize> = (0..items).step_by(chunk_len).collect();
            debug!(
                "map_blocks: {} items in {} chunks of {}",
                items,
                starts.len(),
                chunk_len
            );
            let blocks: Vec<ArrayD<U>> = starts
                .par_iter()
                .map(|&start| {
                    let end = (start + chunk_len).min(items);
                    f(flat.slice_axis(Axis(0), Slice::from(start..end)))
                })
                .collect();

            let flat_out = if blocks.is_empty() {
                let mut empty_shape = vec![0];
                empty_shape.extend(out_base_shape.iter().copied());
                ArrayD::from_shape_vec(IxDyn(&empty_shape), Vec::new())
                    .expect("empty shape holds no elements")
            } else {
                let views: Vec<ArrayViewD<'_, U>> = blocks.iter().map(|b| b.view()).collect();
                ndarray::concatenate(Axis(0), &views)
                    .expect("blocks share their trailing dimensions")
            };
            reshape(flat_out, &result_shape)
        }))
    }

    /// Select along the leading dimensions, one selector per dimension.
    ///
    /// Scalar selectors drop their dimension.
    pub fn index(&self, selectors: &[Selector]) -> Result<LazyArray<T>> {
        if selectors.len() > self.ndim() {
            return Err(MeasurementError::AxesMismatch(format!(
                "too many indices ({}) for an array of rank {}",
                selectors.len(),
                self.ndim()
            )));
        }
        let resolved = selectors
            .iter()
            .zip(&self.shape)
            .map(|(selector, &n)| selector.resolve(n))
            .collect::<Result<Vec<_>>>()?;

        let mut out_shape = Vec::with_capacity(self.ndim());
        for (i, &n) in self.shape.iter().enumerate() {
            match resolved.get(i) {
                Some(Resolved::Scalar(_)) => {}
                Some(Resolved::Positions(p)) => out_shape.push(p.len()),
                None => out_shape.push(n),
            }
        }
        Ok(self.map(out_shape, move |array| select_resolved(array, &resolved)))
    }

    /// Join two arrays along `axis`; all other dimensions must agree.
    pub fn concatenate(&self, other: &LazyArray<T>, axis: usize) -> Result<LazyArray<T>> {
        let compatible = self.ndim() == other.ndim()
            && axis < self.ndim()
            && self
                .shape
                .iter()
                .zip(&other.shape)
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !compatible {
            return Err(MeasurementError::AxesMismatch(format!(
                "cannot concatenate shapes {:?} and {:?} along axis {axis}",
                self.shape, other.shape
            )));
        }
        let mut out_shape = self.shape.clone();
        out_shape[axis] += other.shape[axis];
        let (a, b) = (self.view(), other.view());
        Ok(LazyArray::deferred(out_shape, self.chunk_len, move || {
            ndarray::concatenate(Axis(axis), &[a.compute().view(), b.compute().view()])
                .expect("shapes checked when the node was built")
        }))
    }
}

fn select_resolved<T: Clone>(array: &ArrayD<T>, resolved: &[Resolved]) -> ArrayD<T> {
    let mut out = array.clone();
    for (axis, selection) in resolved.iter().enumerate().rev() {
        out = match selection {
            Resolved::Scalar(i) => out.index_axis(Axis(axis), *i).to_owned(),
            Resolved::Positions(positions) => {
                let identity = positions.len() == out.shape()[axis]
                    && positions.iter().enumerate().all(|(i, &p)| i == p);
                if identity {
                    out
                } else {
                    out.select(Axis(axis), positions)
                }
            }
        };
    }
    out
}

/// Reshape in logical (row-major) order.
pub(crate) fn reshape<T: Clone>(array: ArrayD<T>, shape: &[usize]) -> ArrayD<T> {
    let array = if array.is_standard_layout() {
        array
    } else {
        array.as_standard_layout().into_owned()
    };
    array
        .into_shape(IxDyn(shape))
        .expect("element count is preserved by every reshape")
}
