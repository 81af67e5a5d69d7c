//! Monitored item registry keyed by client handle
//!
//! The registry is the only state shared between caller threads issuing
//! subscribe/unsubscribe requests and the thread delivering publish results.
//! One lock guards the handle counter and the item table; it is never held
//! across a service request or an application callback.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

use parking_lot::Mutex;
use ua_types::{AttributeId, EventFilter, MonitoredItemCreateRequest, NodeId};

use crate::error::{Result, SubscriptionError};

/// Last value below the first allocated client handle.
///
/// Handles at or below this value are left for callers that pick their own
/// handles, so generated and hand-picked handles do not collide. The first
/// handle handed out is `CLIENT_HANDLE_BASE + 1`.
pub const CLIENT_HANDLE_BASE: u32 = 200;

/// One monitored item as known to the client
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemEntry {
    /// Handle chosen by the client; key of the registry
    pub client_handle: u32,
    /// Node being monitored
    pub node_id: NodeId,
    /// Attribute being monitored
    pub attribute_id: AttributeId,
    /// Filter used to decode event notifications
    pub event_filter: Option<EventFilter>,
    /// Monitored item id assigned by the server, unset until creation succeeds
    pub server_handle: Option<u32>,
}

impl MonitoredItemEntry {
    /// Placeholder entry for a request that has not been answered yet
    pub fn from_request(request: &MonitoredItemCreateRequest) -> Self {
        let event_filter = request
            .requested_parameters
            .filter
            .as_ref()
            .and_then(|f| f.as_event_filter())
            .cloned();

        Self {
            client_handle: request.client_handle(),
            node_id: request.item_to_monitor.node_id.clone(),
            attribute_id: request.item_to_monitor.attribute_id,
            event_filter,
            server_handle: None,
        }
    }

    /// Whether the server has confirmed this item
    pub fn is_confirmed(&self) -> bool {
        self.server_handle.is_some()
    }
}

impl fmt::Display for MonitoredItemEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.server_handle {
            Some(server_handle) => write!(
                f,
                "MonitoredItem({}, {}, client={}, server={})",
                self.node_id, self.attribute_id, self.client_handle, server_handle
            ),
            None => write!(
                f,
                "MonitoredItem({}, {}, client={}, pending)",
                self.node_id, self.attribute_id, self.client_handle
            ),
        }
    }
}

struct RegistryState {
    next_handle: u32,
    items: HashMap<u32, MonitoredItemEntry>,
}

/// Thread-safe table of monitored items
pub struct MonitoredItemRegistry {
    state: Mutex<RegistryState>,
}

impl MonitoredItemRegistry {
    /// Create an empty registry whose first generated handle is `CLIENT_HANDLE_BASE + 1`
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next_handle: CLIENT_HANDLE_BASE,
                items: HashMap::new(),
            }),
        }
    }

    /// Allocate a client handle that has never been handed out and is not registered
    pub fn next_client_handle(&self) -> u32 {
        let mut state = self.state.lock();
        loop {
            state.next_handle = state.next_handle.wrapping_add(1);
            if state.next_handle <= CLIENT_HANDLE_BASE {
                state.next_handle = CLIENT_HANDLE_BASE + 1;
            }
            if !state.items.contains_key(&state.next_handle) {
                return state.next_handle;
            }
        }
    }

    /// Register one entry under its client handle
    ///
    /// # Returns
    /// * `Err(SubscriptionError::DuplicateClientHandle)` - If the handle is taken
    pub fn insert(&self, entry: MonitoredItemEntry) -> Result<()> {
        let mut state = self.state.lock();
        if state.items.contains_key(&entry.client_handle) {
            return Err(SubscriptionError::DuplicateClientHandle(entry.client_handle));
        }
        state.items.insert(entry.client_handle, entry);
        Ok(())
    }

    /// Register a batch of entries atomically
    ///
    /// Either every entry is inserted or none is. A handle that is already
    /// registered, or that appears twice in the batch, rejects the batch.
    pub fn insert_batch(&self, entries: Vec<MonitoredItemEntry>) -> Result<()> {
        let mut state = self.state.lock();

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if state.items.contains_key(&entry.client_handle) || !seen.insert(entry.client_handle)
            {
                return Err(SubscriptionError::DuplicateClientHandle(entry.client_handle));
            }
        }

        for entry in entries {
            state.items.insert(entry.client_handle, entry);
        }
        Ok(())
    }

    /// Look up an entry by client handle
    ///
    /// Returns a copy so the lock is released before the caller acts on it.
    pub fn get(&self, client_handle: u32) -> Result<MonitoredItemEntry> {
        self.state
            .lock()
            .items
            .get(&client_handle)
            .cloned()
            .ok_or(SubscriptionError::UnknownHandle(client_handle))
    }

    pub fn contains(&self, client_handle: u32) -> bool {
        self.state.lock().items.contains_key(&client_handle)
    }

    /// Record the server-assigned handle of a placeholder entry
    ///
    /// Returns `false` when no entry exists under `client_handle`.
    pub fn set_server_handle(&self, client_handle: u32, server_handle: u32) -> bool {
        match self.state.lock().items.get_mut(&client_handle) {
            Some(entry) => {
                entry.server_handle = Some(server_handle);
                true
            }
            None => false,
        }
    }

    pub fn remove_by_client_handle(&self, client_handle: u32) -> Option<MonitoredItemEntry> {
        self.state.lock().items.remove(&client_handle)
    }

    /// Remove the entry whose server handle matches
    ///
    /// This is a linear scan over the table.
    pub fn remove_by_server_handle(&self, server_handle: u32) -> Option<MonitoredItemEntry> {
        let mut state = self.state.lock();
        let client_handle = state
            .items
            .values()
            .find(|entry| entry.server_handle == Some(server_handle))
            .map(|entry| entry.client_handle)?;
        state.items.remove(&client_handle)
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Copy of every entry, ordered by client handle
    pub fn snapshot(&self) -> Vec<MonitoredItemEntry> {
        let mut entries: Vec<_> = self.state.lock().items.values().cloned().collect();
        entries.sort_by_key(|entry| entry.client_handle);
        entries
    }

    /// Drop every entry; the handle counter keeps its position
    pub fn clear(&self) {
        self.state.lock().items.clear();
    }
}

impl Default for MonitoredItemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MonitoredItemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MonitoredItemRegistry")
            .field("next_handle", &state.next_handle)
            .field("items", &state.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn entry(client_handle: u32) -> MonitoredItemEntry {
        MonitoredItemEntry {
            client_handle,
            node_id: NodeId::numeric(2, client_handle),
            attribute_id: AttributeId::Value,
            event_filter: None,
            server_handle: None,
        }
    }

    #[test]
    fn test_first_handle_follows_base() {
        let registry = MonitoredItemRegistry::new();
        assert_eq!(registry.next_client_handle(), 201);
        assert_eq!(registry.next_client_handle(), 202);
    }

    #[test]
    fn test_allocation_skips_registered_handles() {
        let registry = MonitoredItemRegistry::new();
        registry.insert(entry(201)).unwrap();
        registry.insert(entry(202)).unwrap();
        assert_eq!(registry.next_client_handle(), 203);
    }

    #[test]
    fn test_insert_and_get() {
        let registry = MonitoredItemRegistry::new();
        registry.insert(entry(201)).unwrap();

        let found = registry.get(201).unwrap();
        assert_eq!(found.node_id, NodeId::numeric(2, 201));
        assert!(!found.is_confirmed());
        assert!(matches!(
            registry.get(999),
            Err(SubscriptionError::UnknownHandle(999))
        ));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let registry = MonitoredItemRegistry::new();
        registry.insert(entry(201)).unwrap();
        assert!(matches!(
            registry.insert(entry(201)),
            Err(SubscriptionError::DuplicateClientHandle(201))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insert_batch_is_all_or_nothing() {
        let registry = MonitoredItemRegistry::new();
        registry.insert(entry(205)).unwrap();

        let result = registry.insert_batch(vec![entry(203), entry(204), entry(205)]);
        assert!(matches!(
            result,
            Err(SubscriptionError::DuplicateClientHandle(205))
        ));
        assert_eq!(registry.len(), 1);

        let result = registry.insert_batch(vec![entry(210), entry(210)]);
        assert!(matches!(
            result,
            Err(SubscriptionError::DuplicateClientHandle(210))
        ));
        assert_eq!(registry.len(), 1);

        registry.insert_batch(vec![entry(203), entry(204)]).unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_remove_by_server_handle_is_exact() {
        let registry = MonitoredItemRegistry::new();
        for handle in 201..=203 {
            registry.insert(entry(handle)).unwrap();
        }
        assert!(registry.set_server_handle(201, 77));
        assert!(registry.set_server_handle(202, 78));
        assert!(!registry.set_server_handle(999, 79));

        let removed = registry.remove_by_server_handle(78).unwrap();
        assert_eq!(removed.client_handle, 202);
        assert!(registry.remove_by_server_handle(78).is_none());

        let remaining: Vec<u32> = registry.snapshot().iter().map(|e| e.client_handle).collect();
        assert_eq!(remaining, vec![201, 203]);
    }

    #[test]
    fn test_unconfirmed_entry_never_matches_server_handle() {
        let registry = MonitoredItemRegistry::new();
        registry.insert(entry(201)).unwrap();
        assert!(registry.remove_by_server_handle(0).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear_keeps_counter() {
        let registry = MonitoredItemRegistry::new();
        let first = registry.next_client_handle();
        registry.insert(entry(first)).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.next_client_handle(), first + 1);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let registry = Arc::new(MonitoredItemRegistry::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                (0..250)
                    .map(|_| registry.next_client_handle())
                    .collect::<Vec<_>>()
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(value > CLIENT_HANDLE_BASE);
                assert!(all.insert(value), "handle {} allocated twice", value);
            }
        }
        assert_eq!(all.len(), 2000);
    }

    proptest! {
        #[test]
        fn prop_generated_handles_never_collide_with_registered(
            preset in proptest::collection::hash_set(201u32..260, 0..40),
            allocations in 1usize..80,
        ) {
            let registry = MonitoredItemRegistry::new();
            for handle in &preset {
                registry.insert(entry(*handle)).unwrap();
            }

            let mut seen = HashSet::new();
            for _ in 0..allocations {
                let handle = registry.next_client_handle();
                prop_assert!(!preset.contains(&handle));
                prop_assert!(seen.insert(handle));
            }
        }
    }
}
