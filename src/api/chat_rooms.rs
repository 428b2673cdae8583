//! Chat room and message endpoints.

use super::HttpApi;
use crate::errors::ApiError;
use crate::models::{ChatRoom, Message, PostMessageRequest};

impl HttpApi {
    /// GET /chatrooms - List the user's chat rooms.
    pub async fn list_chat_rooms(&self) -> Result<Vec<ChatRoom>, ApiError> {
        let resp = self.send(self.client.get(self.url(&["chatrooms"])?)).await?;
        Ok(resp.json().await?)
    }

    /// GET /chatrooms/:id/messages - Message history of one room.
    pub async fn list_messages(&self, chat_room_id: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.url(&["chatrooms", chat_room_id, "messages"])?;
        let resp = self.send(self.client.get(url)).await?;
        Ok(resp.json().await?)
    }

    /// POST /chatrooms/:id/messages - Send a message and get the assistant reply.
    pub async fn create_message(
        &self,
        chat_room_id: &str,
        message: &str,
    ) -> Result<Message, ApiError> {
        let url = self.url(&["chatrooms", chat_room_id, "messages"])?;
        let body = PostMessageRequest {
            message: message.to_string(),
        };
        let resp = self
            .send(self.client.post(url).json(&body))
            .await?;
        Ok(resp.json().await?)
    }
}
