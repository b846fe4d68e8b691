//! Typed parameter slots for prepared statements.
//!
//! Slots own their values; text and blob contents live here until the
//! statement is executed or freed. Index validation happens before any
//! native call is attempted.

use crate::client::{BindValue, BlobHandle, UType};
use crate::error::CubridAdapterError;

/// One populated parameter slot.
#[derive(Debug, Clone)]
pub(crate) enum SlotValue {
    Int(i32),
    Long(i64),
    Double(f64),
    Text(Option<String>),
    Blob(Option<BlobHandle>),
}

impl SlotValue {
    fn to_bind_value(&self) -> BindValue {
        match self {
            SlotValue::Int(v) => BindValue::Int(*v),
            SlotValue::Long(v) => BindValue::Bigint(*v),
            SlotValue::Double(v) => BindValue::Double(*v),
            SlotValue::Text(Some(s)) => BindValue::Text(s.clone()),
            SlotValue::Text(None) => BindValue::Null(UType::String),
            SlotValue::Blob(Some(h)) => BindValue::Blob(*h),
            SlotValue::Blob(None) => BindValue::Null(UType::Blob),
        }
    }
}

/// Slot storage sized from the statement's declared placeholder count.
#[derive(Debug)]
pub(crate) struct ParamSet {
    slots: Vec<Option<SlotValue>>,
}

impl ParamSet {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    pub(crate) fn param_count(&self) -> usize {
        self.slots.len()
    }

    /// Validate a caller-supplied 1-based index.
    pub(crate) fn check_index(&self, index: usize) -> Result<(), CubridAdapterError> {
        if index == 0 || index > self.slots.len() {
            return Err(CubridAdapterError::StatementError(
                "Parameter index is out of range".to_owned(),
            ));
        }
        Ok(())
    }

    /// Store a value in slot `index` (1-based). Returns the blob handle the
    /// new value displaced, if any; the caller owns releasing it.
    pub(crate) fn bind(
        &mut self,
        index: usize,
        value: SlotValue,
    ) -> Result<Option<BlobHandle>, CubridAdapterError> {
        self.check_index(index)?;
        let displaced = match self.slots[index - 1].replace(value) {
            Some(SlotValue::Blob(Some(h))) => Some(h),
            _ => None,
        };
        Ok(displaced)
    }

    /// Populated slots in index order, as `(1-based index, bind value)`.
    pub(crate) fn bind_values(&self) -> impl Iterator<Item = (usize, BindValue)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i + 1, v.to_bind_value())))
    }

    /// Drain every blob handle currently held by a slot. Used at statement
    /// free so each handle is released exactly once.
    pub(crate) fn take_blob_handles(&mut self) -> Vec<BlobHandle> {
        let mut handles = Vec::new();
        for slot in &mut self.slots {
            if let Some(SlotValue::Blob(handle)) = slot {
                if let Some(h) = handle.take() {
                    handles.push(h);
                }
            }
        }
        handles
    }
}
