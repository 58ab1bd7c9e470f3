use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use flashdeck_core::model::{Card, CardId, DeckId, DifficultyFilter};

use super::wire::CardDto;
use super::{CardStatsUpdate, CardStore};
use crate::error::CardStoreError;

/// Card store backed by the flashdeck REST API.
#[derive(Clone)]
pub struct HttpCardStore {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpCardStore {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    #[must_use]
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn check_status(response: Response) -> Result<Response, CardStoreError> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CardStoreError::Unauthorized),
        status if !status.is_success() => Err(CardStoreError::Status(status)),
        _ => Ok(response),
    }
}

#[async_trait]
impl CardStore for HttpCardStore {
    async fn list_cards(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, CardStoreError> {
        let response = self
            .client
            .get(self.url(&format!("/api/decks/{deck_id}/cards")))
            .query(&[("difficulty", filter.as_str())])
            .bearer_auth(&self.token)
            .send()
            .await?;

        let body: Vec<CardDto> = check_status(response)?.json().await?;
        let cards = body
            .into_iter()
            .map(CardDto::into_card)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    async fn update_card_stats(
        &self,
        card_id: CardId,
        update: CardStatsUpdate,
    ) -> Result<(), CardStoreError> {
        let response = self
            .client
            .put(self.url(&format!("/api/cards/{card_id}/stats")))
            .bearer_auth(&self.token)
            .json(&update)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let store = HttpCardStore::new("http://localhost:3000/", "t");
        assert_eq!(store.base_url(), "http://localhost:3000");
        assert_eq!(store.url("/api/cards/1/stats"), "http://localhost:3000/api/cards/1/stats");
    }
}
