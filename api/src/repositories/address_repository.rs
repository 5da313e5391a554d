use std::collections::HashMap;

use async_trait::async_trait;
use domain::{Chain, TrackedAddress};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address already exists in your portfolio")]
    Duplicate,
}

/// Registry of the addresses each user tracks. Uniqueness is per user on
/// the (chain, address) pair; listing preserves insertion order.
#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn list_by_user(&self, user_id: Uuid) -> Vec<TrackedAddress>;
    async fn find_by_id(&self, user_id: Uuid, address_id: Uuid) -> Option<TrackedAddress>;
    async fn add(
        &self,
        user_id: Uuid,
        chain: Chain,
        address: &str,
    ) -> Result<TrackedAddress, AddressError>;
    /// Returns false when the id is unknown for this user; nothing changes.
    async fn remove(&self, user_id: Uuid, address_id: Uuid) -> bool;
}

#[derive(Default)]
pub struct InMemoryAddressRepository {
    entries: RwLock<HashMap<Uuid, Vec<TrackedAddress>>>,
}

impl InMemoryAddressRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AddressRepository for InMemoryAddressRepository {
    async fn list_by_user(&self, user_id: Uuid) -> Vec<TrackedAddress> {
        self.entries
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn find_by_id(&self, user_id: Uuid, address_id: Uuid) -> Option<TrackedAddress> {
        self.entries
            .read()
            .await
            .get(&user_id)
            .and_then(|addresses| addresses.iter().find(|a| a.id == address_id).cloned())
    }

    async fn add(
        &self,
        user_id: Uuid,
        chain: Chain,
        address: &str,
    ) -> Result<TrackedAddress, AddressError> {
        let mut entries = self.entries.write().await;
        let addresses = entries.entry(user_id).or_default();
        if addresses
            .iter()
            .any(|existing| existing.chain == chain && existing.address == address)
        {
            return Err(AddressError::Duplicate);
        }
        let tracked = TrackedAddress {
            id: Uuid::new_v4(),
            user_id,
            chain,
            address: address.to_string(),
        };
        addresses.push(tracked.clone());
        Ok(tracked)
    }

    async fn remove(&self, user_id: Uuid, address_id: Uuid) -> bool {
        let mut entries = self.entries.write().await;
        let Some(addresses) = entries.get_mut(&user_id) else {
            return false;
        };
        let before = addresses.len();
        addresses.retain(|a| a.id != address_id);
        addresses.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_pair_is_rejected_per_user() {
        let repo = InMemoryAddressRepository::new();
        let user = Uuid::new_v4();
        let other_user = Uuid::new_v4();

        repo.add(user, Chain::Bitcoin, "addr-one-111111111111")
            .await
            .unwrap();
        let err = repo
            .add(user, Chain::Bitcoin, "addr-one-111111111111")
            .await
            .unwrap_err();
        assert_eq!(err, AddressError::Duplicate);

        // Same pair under a different chain or user is fine.
        repo.add(user, Chain::Litecoin, "addr-one-111111111111")
            .await
            .unwrap();
        repo.add(other_user, Chain::Bitcoin, "addr-one-111111111111")
            .await
            .unwrap();
        assert_eq!(repo.list_by_user(user).await.len(), 2);
    }

    #[tokio::test]
    async fn remove_unknown_id_leaves_state_untouched() {
        let repo = InMemoryAddressRepository::new();
        let user = Uuid::new_v4();
        repo.add(user, Chain::Dogecoin, "doge-addr-1111111111")
            .await
            .unwrap();

        assert!(!repo.remove(user, Uuid::new_v4()).await);
        assert_eq!(repo.list_by_user(user).await.len(), 1);
    }

    #[tokio::test]
    async fn listing_preserves_insertion_order() {
        let repo = InMemoryAddressRepository::new();
        let user = Uuid::new_v4();
        for n in 0..4 {
            repo.add(user, Chain::Bitcoin, &format!("ordered-address-{n:012}"))
                .await
                .unwrap();
        }
        let listed = repo.list_by_user(user).await;
        let suffixes: Vec<_> = listed
            .iter()
            .map(|a| a.address.chars().last().unwrap())
            .collect();
        assert_eq!(suffixes, vec!['0', '1', '2', '3']);
    }
}
