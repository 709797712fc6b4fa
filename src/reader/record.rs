//! Current-record view.

use crate::dialect::EmptyCellPolicy;

#[derive(Debug, Clone, Default)]
struct FieldSlot {
    value: String,
    qualified: bool,
    null: bool,
}

/// Fields of the most recently decoded record.
///
/// Slots are reused from record to record, so values borrowed from a cursor
/// are only valid until the next decode call. Copy them out with
/// [`RecordCursor::to_vec`] to keep them.
#[derive(Debug, Clone)]
pub struct RecordCursor {
    slots: Vec<FieldSlot>,
    len: usize,
    index: Option<u64>,
    policy: EmptyCellPolicy,
}

impl RecordCursor {
    pub(crate) fn new(policy: EmptyCellPolicy) -> Self {
        RecordCursor {
            slots: Vec::new(),
            len: 0,
            index: None,
            policy,
        }
    }

    /// Number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Zero-based record index, `None` before the first record.
    pub fn index(&self) -> Option<u64> {
        self.index
    }

    /// Field value, or the dialect's empty value when `i` is out of range.
    pub fn get(&self, i: usize) -> Option<&str> {
        match self.slots[..self.len].get(i) {
            Some(slot) if slot.null => None,
            Some(slot) => Some(&slot.value),
            None => self.empty_value(),
        }
    }

    /// What a missing field reads as under the current policy.
    pub(crate) fn empty_value(&self) -> Option<&str> {
        if self.policy.is_null(false) { None } else { Some("") }
    }

    /// Whether field `i` was enclosed in qualifiers. False out of range.
    pub fn is_qualified(&self, i: usize) -> bool {
        self.slots[..self.len].get(i).is_some_and(|slot| slot.qualified)
    }

    /// Iterate over the field values.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.slots[..self.len]
            .iter()
            .map(|slot| (!slot.null).then_some(slot.value.as_str()))
    }

    /// Owned copy of the field values.
    pub fn to_vec(&self) -> Vec<Option<String>> {
        self.iter().map(|v| v.map(str::to_owned)).collect()
    }

    pub(crate) fn set_policy(&mut self, policy: EmptyCellPolicy) {
        self.policy = policy;
    }

    pub(crate) fn set_index(&mut self, index: Option<u64>) {
        self.index = index;
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
        self.index = None;
    }

    pub(crate) fn release(&mut self) {
        self.slots = Vec::new();
        self.len = 0;
    }

    /// Claim the next slot, doubling slot storage when full. The slot's
    /// value is cleared and its flags are left for [`Self::commit`].
    pub(crate) fn next_value(&mut self) -> &mut String {
        if self.len == self.slots.len() {
            let grow = self.slots.len().max(4);
            self.slots.resize_with(self.slots.len() + grow, FieldSlot::default);
        }
        let slot = &mut self.slots[self.len];
        slot.value.clear();
        &mut slot.value
    }

    /// Finish the slot claimed by [`Self::next_value`].
    pub(crate) fn commit(&mut self, qualified: bool) {
        let policy = self.policy;
        let slot = &mut self.slots[self.len];
        slot.qualified = qualified;
        slot.null = slot.value.is_empty() && policy.is_null(qualified);
        self.len += 1;
    }
}
