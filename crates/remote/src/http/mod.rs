use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    AnswerOption, AttemptId, Lesson, QuestionId, QuestionQuery, QuestionRef, Subject, SubjectId,
    SubmissionRecord, Topic, TopicId,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::repository::{AttemptRepository, Backend, CatalogRepository, RemoteError};

mod wire;

use wire::{
    AnswerDto, LessonDto, ListEnvelope, QuestionDto, SubjectDto, SubmitAttemptRequest, TopicDto,
    parse_attempt_id,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Catalog service client over HTTP.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Build a client rooted at `base_url` (for example `https://localhost:7285/api`).
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::InvalidBaseUrl` if the URL cannot be parsed or is not http(s).
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::InvalidBaseUrl(e.to_string()))
    }

    async fn get_list<T, D>(&self, path: &str) -> Result<Vec<T>, RemoteError>
    where
        D: DeserializeOwned + Into<T>,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "fetching catalog list");
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound);
        }
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }

        let body: ListEnvelope<D> = response.json().await?;
        Ok(body.into_vec().into_iter().map(Into::into).collect())
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, RemoteError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| RemoteError::InvalidBaseUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RemoteError::InvalidBaseUrl(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn topics_path(subject: SubjectId) -> String {
    format!("Topic/BySubject/{subject}")
}

fn lessons_path(topic: TopicId) -> String {
    format!("Lesson/GetLessonsByTopic/{topic}")
}

fn questions_path(query: QuestionQuery) -> String {
    format!(
        "Question/subject/{}/topic/{}/lesson/{}?count={}",
        query.subject, query.topic, query.lesson, query.count
    )
}

fn answers_path(question: QuestionId) -> String {
    format!("Answer/GetAnswersByQuestion/{question}")
}

#[async_trait]
impl CatalogRepository for HttpBackend {
    async fn list_subjects(&self) -> Result<Vec<Subject>, RemoteError> {
        self.get_list::<Subject, SubjectDto>("Subject").await
    }

    async fn list_topics(&self, subject: SubjectId) -> Result<Vec<Topic>, RemoteError> {
        self.get_list::<Topic, TopicDto>(&topics_path(subject)).await
    }

    async fn list_lessons(&self, topic: TopicId) -> Result<Vec<Lesson>, RemoteError> {
        self.get_list::<Lesson, LessonDto>(&lessons_path(topic)).await
    }

    async fn list_questions(&self, query: QuestionQuery) -> Result<Vec<QuestionRef>, RemoteError> {
        self.get_list::<QuestionRef, QuestionDto>(&questions_path(query))
            .await
    }

    async fn list_answers(&self, question: QuestionId) -> Result<Vec<AnswerOption>, RemoteError> {
        self.get_list::<AnswerOption, AnswerDto>(&answers_path(question))
            .await
    }
}

#[async_trait]
impl AttemptRepository for HttpBackend {
    async fn submit_attempt(&self, record: &SubmissionRecord) -> Result<AttemptId, RemoteError> {
        let url = self.endpoint("QuizAttempt/submit")?;
        let payload = SubmitAttemptRequest::from_record(record);

        let response = self.client.post(url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }

        let body = response.bytes().await?;
        let id = parse_attempt_id(&body)?;
        tracing::info!(attempt_id = %id, "attempt accepted by catalog service");
        Ok(id)
    }

    fn certificate_url(&self, attempt: AttemptId) -> Option<String> {
        self.endpoint(&format!("Certificate/download/{attempt}"))
            .ok()
            .map(String::from)
    }
}

impl Backend {
    /// Build a `Backend` that talks to the catalog service over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the base URL is invalid or the client cannot be built.
    pub fn http(base_url: &str) -> Result<Self, RemoteError> {
        let client = HttpBackend::new(base_url)?;
        let catalog: Arc<dyn CatalogRepository> = Arc::new(client.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(client);
        Ok(Self { catalog, attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::LessonId;

    #[test]
    fn base_url_gains_trailing_slash() {
        let backend = HttpBackend::new("https://localhost:7285/api").unwrap();
        assert_eq!(
            backend.endpoint("Subject").unwrap().as_str(),
            "https://localhost:7285/api/Subject"
        );
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(matches!(
            HttpBackend::new("ftp://example.com/api"),
            Err(RemoteError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(RemoteError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn builds_catalog_paths() {
        let backend = HttpBackend::new("https://quiz.example/api/").unwrap();
        let query = QuestionQuery {
            subject: SubjectId::new(1),
            topic: TopicId::new(2),
            lesson: LessonId::new(3),
            count: 10,
        };

        assert_eq!(
            backend.endpoint(&questions_path(query)).unwrap().as_str(),
            "https://quiz.example/api/Question/subject/1/topic/2/lesson/3?count=10"
        );
        assert_eq!(
            backend.endpoint(&topics_path(SubjectId::new(4))).unwrap().as_str(),
            "https://quiz.example/api/Topic/BySubject/4"
        );
        assert_eq!(
            backend.endpoint(&lessons_path(TopicId::new(5))).unwrap().as_str(),
            "https://quiz.example/api/Lesson/GetLessonsByTopic/5"
        );
        assert_eq!(
            backend
                .endpoint(&answers_path(QuestionId::new(6)))
                .unwrap()
                .as_str(),
            "https://quiz.example/api/Answer/GetAnswersByQuestion/6"
        );
    }

    #[test]
    fn certificate_url_points_at_download_endpoint() {
        let backend = HttpBackend::new("https://quiz.example/api").unwrap();
        assert_eq!(
            backend.certificate_url(AttemptId::new(9)).as_deref(),
            Some("https://quiz.example/api/Certificate/download/9")
        );
    }
}
