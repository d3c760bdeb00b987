//! Enrolment notifications: courses are subjects, notifiers observe them.

use std::fmt;
use std::sync::Arc;

/// A student joined a course.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enrollment {
    pub course_id: i64,
    pub course_name: String,
    pub student_id: i64,
    pub student_name: String,
}

pub trait Observer: Send + Sync {
    fn update(&self, event: &Enrollment);
}

/// Observers attached to one course.
#[derive(Clone, Default)]
pub struct Subject {
    observers: Vec<Arc<dyn Observer>>,
}

impl Subject {
    pub fn attach(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&self, event: &Enrollment) {
        for observer in &self.observers {
            observer.update(event);
        }
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject").field("observers", &self.observers.len()).finish()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EmailNotifier;

impl Observer for EmailNotifier {
    fn update(&self, event: &Enrollment) {
        tracing::info!(
            target: "campus::notify",
            course = %event.course_name,
            "EMAIL-> {} joined us",
            event.student_name
        );
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SmsNotifier;

impl Observer for SmsNotifier {
    fn update(&self, event: &Enrollment) {
        tracing::info!(
            target: "campus::notify",
            course = %event.course_name,
            "SMS-> {} joined us",
            event.student_name
        );
    }
}

/// The notifiers every new course gets.
pub fn default_observers() -> Vec<Arc<dyn Observer>> {
    vec![Arc::new(EmailNotifier), Arc::new(SmsNotifier)]
}
