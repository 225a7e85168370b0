use std::sync::Arc;

use ember_hub::Hub;
use ember_ids::{FriendshipId, UserId};
use ember_model::{DomainError, DomainResult, Friendship, FriendshipStatus};
use ember_protocol::{FriendRemovePayload, ServerEvent};
use ember_repo::{FriendRepository, UserRepository};

pub struct FriendService {
    friends: Arc<dyn FriendRepository>,
    users: Arc<dyn UserRepository>,
    hub: Arc<Hub>,
}

impl FriendService {
    pub fn new(friends: Arc<dyn FriendRepository>, users: Arc<dyn UserRepository>, hub: Arc<Hub>) -> Self {
        Self { friends, users, hub }
    }

    /// Resolves the addressee by username before delegating to [`Self::request`]
    /// — the wire intent carries a username, everywhere else in this service
    /// deals in resolved ids.
    pub async fn request_by_username(&self, user_id: UserId, username: &str) -> DomainResult<Friendship> {
        let friend = self.users.get_by_username(username).await?;
        self.request(user_id, friend.id).await
    }

    pub async fn request(&self, user_id: UserId, friend_id: UserId) -> DomainResult<Friendship> {
        if user_id == friend_id {
            return Err(DomainError::InvalidInput("cannot friend yourself".into()));
        }
        if self.friends.find(user_id, friend_id).await?.is_some() {
            return Err(DomainError::AlreadyExists("friendship"));
        }
        let friendship = self.friends.request(user_id, friend_id).await?;
        self.hub.broadcast_to_user(friend_id, ServerEvent::FriendRequestCreate(friendship.clone())).await;
        Ok(friendship)
    }

    /// Only the addressee of the pending request may accept — `user_id` must
    /// match `friendship.friend_id`, not `friendship.user_id`.
    pub async fn accept(&self, id: FriendshipId, user_id: UserId) -> DomainResult<Friendship> {
        let friendship = self.get(id, user_id).await?;
        if friendship.friend_id != user_id || friendship.status != FriendshipStatus::Pending {
            return Err(DomainError::Forbidden);
        }
        let accepted = self.friends.accept(id).await?;
        self.hub.broadcast_to_users(&[accepted.user_id, accepted.friend_id], ServerEvent::FriendRequestAccept(accepted.clone())).await;
        Ok(accepted)
    }

    pub async fn decline(&self, id: FriendshipId, user_id: UserId) -> DomainResult<()> {
        let friendship = self.get(id, user_id).await?;
        self.friends.decline(id).await?;
        let other = if friendship.user_id == user_id { friendship.friend_id } else { friendship.user_id };
        self.hub.broadcast_to_user(other, ServerEvent::FriendRequestDecline { friendship_id: id }).await;
        Ok(())
    }

    pub async fn remove(&self, user_id: UserId, friend_id: UserId) -> DomainResult<()> {
        self.friends.remove(user_id, friend_id).await?;
        self.hub
            .broadcast_to_users(&[user_id, friend_id], ServerEvent::FriendRemove(FriendRemovePayload { user_id, friend_id }))
            .await;
        Ok(())
    }

    pub async fn list(&self, user_id: UserId) -> DomainResult<Vec<Friendship>> {
        self.friends.list_for_user(user_id).await
    }

    pub async fn get(&self, id: FriendshipId, user_id: UserId) -> DomainResult<Friendship> {
        let friendships = self.friends.list_for_user(user_id).await?;
        friendships.into_iter().find(|f| f.id == id).ok_or(DomainError::NotFound("friendship"))
    }
}
