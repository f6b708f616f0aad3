use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{CustomerQuestion, QuestionStatus, Testimonial};
use crate::error::{Result, ShopError};
use crate::services::notify::NotifyService;
use crate::services::ports::CaptchaVerifier;
use crate::storage::Storage;

pub struct SupportService {
    storage: Arc<dyn Storage>,
    captcha: Arc<dyn CaptchaVerifier>,
    notify: Arc<NotifyService>,
}

impl SupportService {
    pub fn new(
        storage: Arc<dyn Storage>,
        captcha: Arc<dyn CaptchaVerifier>,
        notify: Arc<NotifyService>,
    ) -> Self {
        Self {
            storage,
            captcha,
            notify,
        }
    }

    /// Takes a contact-form question. The captcha gate runs first; a
    /// rejected token means no row is written.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_question(
        &self,
        user_id: Option<Uuid>,
        name: String,
        email: String,
        phone: Option<String>,
        subject: String,
        body: String,
        captcha_token: &str,
        remote_ip: Option<&str>,
    ) -> Result<CustomerQuestion> {
        self.captcha
            .verify(captcha_token, remote_ip)
            .await
            .map_err(|e| {
                super::note_provider_error("recaptcha", &e);
                e
            })?;

        let mut question = CustomerQuestion {
            id: None,
            user_id,
            name,
            email,
            phone,
            subject,
            body,
            status: QuestionStatus::Received,
            answer: None,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.storage.create_question(&mut question).await?;
        crate::metrics::support::question_received();
        info!("Received question '{}'", question.subject);
        Ok(question)
    }

    /// Answers a question and tries to tell the asker by email. The email
    /// is best-effort; the answer is stored either way.
    pub async fn answer_question(
        &self,
        question_id: Uuid,
        answer: String,
    ) -> Result<CustomerQuestion> {
        let mut question = self
            .storage
            .get_question_by_id(question_id)
            .await?
            .filter(|q| !q.is_removed)
            .ok_or(ShopError::QuestionNotFound)?;

        question.answer = Some(answer);
        question.status = QuestionStatus::Answered;
        self.storage.update_question(&question).await?;
        crate::metrics::support::question_answered();

        if !question.email.trim().is_empty() {
            let subject = format!("Re: {}", question.subject);
            let body = format!(
                "Hello {},\n\nYour question has been answered:\n\n{}\n\n- pinshop support",
                question.name,
                question.answer.as_deref().unwrap_or_default()
            );
            if let Err(e) = self
                .notify
                .send_email_with_fallback(&question.email, &subject, &body)
                .await
            {
                warn!(
                    "Could not email the answer for question {}: {}",
                    question_id, e
                );
            }
        }
        Ok(question)
    }

    pub async fn my_questions(&self, user_id: Uuid) -> Result<Vec<CustomerQuestion>> {
        let mut questions = self.storage.list_questions_by_user(user_id).await?;
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(questions)
    }

    pub async fn questions_by_status(
        &self,
        status: Option<QuestionStatus>,
    ) -> Result<Vec<CustomerQuestion>> {
        let mut questions = self.storage.list_questions_by_status(status).await?;
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(questions)
    }

    pub async fn remove_question(&self, question_id: Uuid) -> Result<()> {
        self.storage.remove_question(question_id).await
    }

    // Testimonials

    /// Members submit testimonials unpublished; an admin decides what the
    /// storefront shows.
    pub async fn create_testimonial(
        &self,
        user_id: Uuid,
        author_name: String,
        body: String,
        rating: u8,
    ) -> Result<Testimonial> {
        if !(1..=5).contains(&rating) {
            return Err(ShopError::Validation(
                "rating must be between 1 and 5".into(),
            ));
        }
        let mut testimonial = Testimonial {
            id: None,
            user_id,
            author_name,
            body,
            rating,
            is_published: false,
            is_removed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.storage.create_testimonial(&mut testimonial).await?;
        Ok(testimonial)
    }

    pub async fn set_testimonial_published(
        &self,
        testimonial_id: Uuid,
        published: bool,
    ) -> Result<Testimonial> {
        let mut testimonial = self
            .storage
            .get_testimonial_by_id(testimonial_id)
            .await?
            .filter(|t| !t.is_removed)
            .ok_or(ShopError::TestimonialNotFound)?;
        testimonial.is_published = published;
        self.storage.update_testimonial(&testimonial).await?;
        Ok(testimonial)
    }

    pub async fn remove_testimonial(&self, testimonial_id: Uuid) -> Result<()> {
        self.storage.remove_testimonial(testimonial_id).await
    }

    pub async fn published_testimonials(&self) -> Result<Vec<Testimonial>> {
        let mut testimonials = self.storage.list_published_testimonials().await?;
        testimonials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(testimonials)
    }

    pub async fn admin_testimonials(&self) -> Result<Vec<Testimonial>> {
        self.storage.list_all_testimonials().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    struct StubCaptcha {
        pass: bool,
    }

    #[async_trait]
    impl CaptchaVerifier for StubCaptcha {
        async fn verify(&self, _token: &str, _remote_ip: Option<&str>) -> Result<()> {
            if self.pass {
                Ok(())
            } else {
                Err(ShopError::RecaptchaRejected)
            }
        }
    }

    fn service(storage: Arc<MemoryStorage>, captcha_pass: bool) -> SupportService {
        SupportService::new(
            storage,
            Arc::new(StubCaptcha { pass: captcha_pass }),
            Arc::new(NotifyService::new(Vec::new(), None, None, None)),
        )
    }

    async fn submit(service: &SupportService) -> CustomerQuestion {
        service
            .submit_question(
                None,
                "Alice".into(),
                "alice@example.com".into(),
                None,
                "Where is my code?".into(),
                "Ordered yesterday, nothing arrived.".into(),
                "token",
                Some("10.0.0.1"),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failed_captcha_writes_no_row() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service(storage.clone(), false);

        let err = service
            .submit_question(
                None,
                "Bot".into(),
                "bot@example.com".into(),
                None,
                "spam".into(),
                "spam".into(),
                "bad-token",
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::RecaptchaRejected));
        assert!(storage
            .list_questions_by_status(None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn answering_moves_the_question_to_answered() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service(storage.clone(), true);
        let question = submit(&service).await;

        let answered = service
            .answer_question(question.id.unwrap(), "Check your spam folder.".into())
            .await
            .unwrap();
        assert_eq!(answered.status, QuestionStatus::Answered);
        assert_eq!(answered.answer.as_deref(), Some("Check your spam folder."));

        let open = service
            .questions_by_status(Some(QuestionStatus::Received))
            .await
            .unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn answering_a_missing_question_is_not_found() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service(storage, true);
        let err = service
            .answer_question(Uuid::new_v4(), "hello".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::QuestionNotFound));
    }

    #[tokio::test]
    async fn testimonials_surface_only_when_published() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service(storage, true);
        let author = Uuid::new_v4();

        let testimonial = service
            .create_testimonial(author, "Bob".into(), "Instant delivery!".into(), 5)
            .await
            .unwrap();
        assert!(service.published_testimonials().await.unwrap().is_empty());

        service
            .set_testimonial_published(testimonial.id.unwrap(), true)
            .await
            .unwrap();
        let published = service.published_testimonials().await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].author_name, "Bob");

        service
            .set_testimonial_published(testimonial.id.unwrap(), false)
            .await
            .unwrap();
        assert!(service.published_testimonials().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service(storage, true);
        let err = service
            .create_testimonial(Uuid::new_v4(), "Eve".into(), "meh".into(), 6)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }
}
