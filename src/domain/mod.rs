//! Domain objects: users, courses and the category tree, with their factories.
//! Links between objects are ids; the engine owns the objects themselves.

pub mod observer;
pub use observer::{default_observers, EmailNotifier, Enrollment, Observer, SmsNotifier, Subject};

use crate::error::AppError;
use crate::mapper::{record_i64, record_str, Record};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// An object persisted to one table through the mapper layer.
pub trait DomainObject {
    const TABLE: &'static str;

    /// Database id, None until the row has been inserted.
    fn id(&self) -> Option<i64>;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self, AppError>
    where
        Self: Sized;
}

fn base_record(id: Option<i64>, name: &str) -> Record {
    let mut record = Record::new();
    if let Some(id) = id {
        record.insert("id".into(), Value::from(id));
    }
    record.insert("name".into(), Value::from(name));
    record
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Student {
    pub id: Option<i64>,
    pub name: String,
    pub courses: Vec<i64>,
}

impl Student {
    pub fn new(id: Option<i64>, name: impl Into<String>) -> Self {
        Student {
            id,
            name: name.into(),
            courses: Vec::new(),
        }
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }
}

impl DomainObject for Student {
    const TABLE: &'static str = "student";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_record(&self) -> Record {
        base_record(self.id, &self.name)
    }

    fn from_record(record: &Record) -> Result<Self, AppError> {
        Ok(Student::new(
            Some(record_i64(record, "id")?),
            record_str(record, "name")?,
        ))
    }
}

/// Teachers have no table; they live in memory only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Teacher {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum User {
    Student(Student),
    Teacher(Teacher),
}

impl User {
    pub fn name(&self) -> &str {
        match self {
            User::Student(s) => &s.name,
            User::Teacher(t) => &t.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            User::Student(_) => "student",
            User::Teacher(_) => "teacher",
        }
    }
}

pub struct UserFactory;

impl UserFactory {
    pub fn create(kind: &str, name: &str, id: Option<i64>) -> Result<User, AppError> {
        match kind {
            "student" => Ok(User::Student(Student::new(id, name))),
            "teacher" => Ok(User::Teacher(Teacher {
                id,
                name: name.to_string(),
            })),
            other => Err(AppError::Validation(format!("unknown user type '{}'", other))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CourseKind {
    Interactive,
    #[default]
    Record,
}

impl CourseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseKind::Interactive => "interactive",
            CourseKind::Record => "record",
        }
    }
}

impl fmt::Display for CourseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(CourseKind::Interactive),
            "record" => Ok(CourseKind::Record),
            other => Err(AppError::Validation(format!("unknown course type '{}'", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Course {
    pub id: Option<i64>,
    pub name: String,
    pub kind: CourseKind,
    pub category_id: i64,
    pub students: Vec<i64>,
    pub subject: Subject,
}

impl Course {
    pub fn new(id: Option<i64>, name: impl Into<String>, kind: CourseKind, category_id: i64) -> Self {
        Course {
            id,
            name: name.into(),
            kind,
            category_id,
            students: Vec::new(),
            subject: Subject::default(),
        }
    }

    /// Prototype copy: same kind, category and observers; no id and no students.
    pub fn clone_as(&self, name: impl Into<String>) -> Course {
        let mut copy = self.clone();
        copy.id = None;
        copy.name = name.into();
        copy.students.clear();
        copy
    }
}

impl DomainObject for Course {
    const TABLE: &'static str = "course";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = base_record(self.id, &self.name);
        record.insert("kind".into(), Value::from(self.kind.as_str()));
        record.insert("category_id".into(), Value::from(self.category_id));
        record
    }

    fn from_record(record: &Record) -> Result<Self, AppError> {
        let kind = match record.get("kind").and_then(Value::as_str) {
            Some(k) => k.parse()?,
            None => CourseKind::default(),
        };
        Ok(Course::new(
            Some(record_i64(record, "id")?),
            record_str(record, "name")?,
            kind,
            record_i64(record, "category_id")?,
        ))
    }
}

pub struct CourseFactory;

impl CourseFactory {
    pub fn create(kind: &str, name: &str, category_id: i64, id: Option<i64>) -> Result<Course, AppError> {
        Ok(Course::new(id, name, kind.parse()?, category_id))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
    pub parent: Option<i64>,
    pub children: Vec<i64>,
    pub courses: Vec<i64>,
}

impl Category {
    pub fn new(id: Option<i64>, name: impl Into<String>, parent: Option<i64>) -> Self {
        Category {
            id,
            name: name.into(),
            parent,
            children: Vec::new(),
            courses: Vec::new(),
        }
    }
}

impl DomainObject for Category {
    const TABLE: &'static str = "category";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = base_record(self.id, &self.name);
        record.insert("category_id".into(), self.parent.map(Value::from).unwrap_or(Value::Null));
        record
    }

    fn from_record(record: &Record) -> Result<Self, AppError> {
        let parent = match record.get("category_id") {
            None | Some(Value::Null) => None,
            Some(_) => Some(record_i64(record, "category_id")?),
        };
        Ok(Category::new(
            Some(record_i64(record, "id")?),
            record_str(record, "name")?,
            parent,
        ))
    }
}
