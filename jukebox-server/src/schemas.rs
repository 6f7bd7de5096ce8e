use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRoomSchema {
    pub guest_can_pause: bool,
    #[validate(range(min = 1))]
    pub votes_to_skip: i32,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JoinRoomSchema {
    #[validate(length(equal = 4))]
    pub code: String,
}

/// The queue body carries the summary fields from the search result, so the
/// room can keep its queue-add record without a second provider call.
#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueueSchema {
    #[validate(length(min = 1, max = 200))]
    pub uri: String,
    #[validate(length(min = 1, max = 100))]
    pub id: String,
    #[validate(length(max = 200))]
    pub title: String,
    #[validate(length(max = 200))]
    pub artist: String,
    pub album_art_url: Option<String>,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}

#[cfg(test)]
mod test {
    use validator::Validate;

    use super::{JoinRoomSchema, NewRoomSchema};

    #[test]
    fn rooms_require_at_least_one_vote_to_skip() {
        let invalid = NewRoomSchema {
            guest_can_pause: true,
            votes_to_skip: 0,
        };
        assert!(invalid.validate().is_err());

        let valid = NewRoomSchema {
            guest_can_pause: true,
            votes_to_skip: 1,
        };
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn join_codes_are_exactly_four_characters() {
        let short = JoinRoomSchema {
            code: "ABC".to_string(),
        };
        assert!(short.validate().is_err());

        let exact = JoinRoomSchema {
            code: "AB12".to_string(),
        };
        assert!(exact.validate().is_ok());
    }
}
