//! Engine: the in-memory object graph (categories, courses, students, teachers).
//! Hydrated from the database at startup; every mutation is written through a UnitOfWork
//! before the graph changes, so memory never runs ahead of the database.

use crate::domain::{
    Category, Course, CourseFactory, DomainObject, Enrollment, Observer, Student, Teacher, User, UserFactory,
};
use crate::error::AppError;
use crate::mapper::{record_i64, CommitReport, MapperRegistry, Record, UnitOfWork};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_NAME_LEN: usize = 200;
const COPY_PREFIX: &str = "copy_";

pub struct Engine {
    pool: SqlitePool,
    registry: Arc<MapperRegistry>,
    observers: Vec<Arc<dyn Observer>>,
    categories: BTreeMap<i64, Category>,
    courses: BTreeMap<i64, Course>,
    students: BTreeMap<i64, Student>,
    teachers: Vec<Teacher>,
}

fn validate_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}

fn inserted_id(report: &CommitReport, index: usize) -> Result<i64, AppError> {
    let row = report
        .inserted
        .get(index)
        .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
    record_i64(row, "id")
}

fn saved_id<T: DomainObject>(obj: &T) -> Result<i64, AppError> {
    obj.id()
        .ok_or_else(|| AppError::Validation(format!("{} row without id", T::TABLE)))
}

impl Engine {
    /// Build the graph from the database: categories first (then parent links), courses, students, enrolments.
    pub async fn load(
        pool: SqlitePool,
        registry: Arc<MapperRegistry>,
        observers: Vec<Arc<dyn Observer>>,
    ) -> Result<Self, AppError> {
        let mut engine = Engine {
            pool,
            registry,
            observers,
            categories: BTreeMap::new(),
            courses: BTreeMap::new(),
            students: BTreeMap::new(),
            teachers: Vec::new(),
        };

        let rows = engine.registry.get_mapper(Category::TABLE)?.all(&engine.pool).await?;
        for row in &rows {
            let category = Category::from_record(row)?;
            engine.categories.insert(saved_id(&category)?, category);
        }
        let links: Vec<(i64, i64)> = engine
            .categories
            .iter()
            .filter_map(|(id, c)| c.parent.map(|p| (*id, p)))
            .collect();
        for (child, parent) in links {
            engine.category_mut(parent)?.children.push(child);
        }
        engine.check_category_tree()?;

        let rows = engine.registry.get_mapper(Course::TABLE)?.all(&engine.pool).await?;
        for row in &rows {
            let mut course = Course::from_record(row)?;
            let id = saved_id(&course)?;
            engine.category_mut(course.category_id)?.courses.push(id);
            engine.attach_observers(&mut course);
            engine.courses.insert(id, course);
        }

        let rows = engine.registry.get_mapper(Student::TABLE)?.all(&engine.pool).await?;
        for row in &rows {
            let student = Student::from_record(row)?;
            engine.students.insert(saved_id(&student)?, student);
        }

        let rows = engine.registry.get_mapper("course_student")?.all(&engine.pool).await?;
        for row in &rows {
            let course_id = record_i64(row, "course_id")?;
            let student_id = record_i64(row, "student_id")?;
            engine.course_mut(course_id)?.students.push(student_id);
            engine.student_mut(student_id)?.courses.push(course_id);
        }

        tracing::info!(
            categories = engine.categories.len(),
            courses = engine.courses.len(),
            students = engine.students.len(),
            "engine loaded"
        );
        Ok(engine)
    }

    pub fn create_user(kind: &str, name: &str, id: Option<i64>) -> Result<User, AppError> {
        UserFactory::create(kind, name, id)
    }

    pub fn create_category(name: &str, parent: Option<i64>) -> Category {
        Category::new(None, name, parent)
    }

    pub fn create_course(kind: &str, name: &str, category_id: i64) -> Result<Course, AppError> {
        CourseFactory::create(kind, name, category_id, None)
    }

    /// Every parent chain must end at a root; the recursive counts rely on it.
    fn check_category_tree(&self) -> Result<(), AppError> {
        for &start in self.categories.keys() {
            let mut seen = vec![start];
            let mut current = start;
            while let Some(parent) = self.find_category_by_id(current)?.parent {
                if seen.contains(&parent) {
                    return Err(AppError::Validation(format!(
                        "category {} is its own ancestor",
                        parent
                    )));
                }
                seen.push(parent);
                current = parent;
            }
        }
        Ok(())
    }

    fn attach_observers(&self, course: &mut Course) {
        for observer in &self.observers {
            course.subject.attach(observer.clone());
        }
    }

    async fn commit(&self, uow: &mut UnitOfWork) -> Result<CommitReport, AppError> {
        uow.commit(&self.pool, &self.registry).await
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn add_category(&mut self, name: &str, parent: Option<i64>) -> Result<i64, AppError> {
        let name = validate_name(name)?;
        if let Some(p) = parent {
            self.find_category_by_id(p)?;
        }
        let mut category = Self::create_category(name, parent);
        let mut uow = UnitOfWork::new();
        let index = uow.register_new_object(&category);
        let id = inserted_id(&self.commit(&mut uow).await?, index)?;

        category.id = Some(id);
        if let Some(p) = parent {
            self.category_mut(p)?.children.push(id);
        }
        self.categories.insert(id, category);
        tracing::info!(id, name, "category created");
        Ok(id)
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn add_course(&mut self, kind: &str, name: &str, category_id: i64) -> Result<i64, AppError> {
        let name = validate_name(name)?;
        self.find_category_by_id(category_id)?;
        let course = Self::create_course(kind, name, category_id)?;
        self.insert_course(course).await
    }

    async fn insert_course(&mut self, mut course: Course) -> Result<i64, AppError> {
        let mut uow = UnitOfWork::new();
        let index = uow.register_new_object(&course);
        let id = inserted_id(&self.commit(&mut uow).await?, index)?;

        course.id = Some(id);
        if course.subject.is_empty() {
            self.attach_observers(&mut course);
        }
        self.category_mut(course.category_id)?.courses.push(id);
        tracing::info!(id, name = %course.name, kind = %course.kind, "course created");
        self.courses.insert(id, course);
        Ok(id)
    }

    /// Copy the course called `name` (prototype) into `copy_<name>` in the same category.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn copy_course(&mut self, name: &str) -> Result<i64, AppError> {
        let source = self
            .get_course_by_name(name)
            .ok_or_else(|| AppError::NotFound(format!("course '{}'", name)))?;
        let base: String = source.name.chars().take(MAX_NAME_LEN - COPY_PREFIX.len()).collect();
        let copy = source.clone_as(format!("{}{}", COPY_PREFIX, base));
        self.insert_course(copy).await
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn add_student(&mut self, name: &str) -> Result<i64, AppError> {
        let name = validate_name(name)?;
        let mut student = match Self::create_user("student", name, None)? {
            User::Student(s) => s,
            User::Teacher(_) => return Err(AppError::Validation("expected a student".into())),
        };
        let mut uow = UnitOfWork::new();
        let index = uow.register_new_object(&student);
        let id = inserted_id(&self.commit(&mut uow).await?, index)?;

        student.id = Some(id);
        self.students.insert(id, student);
        tracing::info!(id, name, "student created");
        Ok(id)
    }

    /// Teachers are kept in memory only.
    pub fn add_teacher(&mut self, name: &str) -> Result<i64, AppError> {
        let name = validate_name(name)?;
        let id = self.teachers.len() as i64 + 1;
        match Self::create_user("teacher", name, Some(id))? {
            User::Teacher(t) => self.teachers.push(t),
            User::Student(_) => return Err(AppError::Validation("expected a teacher".into())),
        }
        Ok(id)
    }

    /// Put a student on a course and notify the course's observers.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn enroll(&mut self, course_id: i64, student_id: i64) -> Result<(), AppError> {
        let course = self
            .get_course_by_id(course_id)
            .ok_or_else(|| AppError::NotFound(format!("course {}", course_id)))?;
        let student = self.find_student_by_id(student_id)?;
        if course.students.contains(&student_id) {
            return Err(AppError::Conflict(format!(
                "student {} is already on course {}",
                student_id, course_id
            )));
        }
        let event = Enrollment {
            course_id,
            course_name: course.name.clone(),
            student_id,
            student_name: student.name.clone(),
        };

        let mut link = Record::new();
        link.insert("course_id".into(), Value::from(course_id));
        link.insert("student_id".into(), Value::from(student_id));
        let mut uow = UnitOfWork::new();
        uow.register_new("course_student", link);
        self.commit(&mut uow).await?;

        self.student_mut(student_id)?.courses.push(course_id);
        let course = self.course_mut(course_id)?;
        course.students.push(student_id);
        course.subject.notify(&event);
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn rename_course(&mut self, id: i64, name: &str) -> Result<(), AppError> {
        let name = validate_name(name)?.to_string();
        let mut renamed = self
            .get_course_by_id(id)
            .ok_or_else(|| AppError::NotFound(format!("course {}", id)))?
            .clone();
        renamed.name = name;
        let mut uow = UnitOfWork::new();
        uow.register_dirty_object(&renamed)?;
        self.commit(&mut uow).await?;
        self.courses.insert(id, renamed);
        Ok(())
    }

    /// Delete a course together with its enrolments.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub async fn remove_course(&mut self, id: i64) -> Result<(), AppError> {
        let course = self
            .get_course_by_id(id)
            .ok_or_else(|| AppError::NotFound(format!("course {}", id)))?;
        let mut uow = UnitOfWork::new();
        uow.register_removed("course_student", vec![("course_id".to_string(), Value::from(id))]);
        uow.register_removed_object(course)?;
        self.commit(&mut uow).await?;

        if let Some(course) = self.courses.remove(&id) {
            for student_id in &course.students {
                if let Some(student) = self.students.get_mut(student_id) {
                    student.courses.retain(|c| *c != id);
                }
            }
            if let Some(category) = self.categories.get_mut(&course.category_id) {
                category.courses.retain(|c| *c != id);
            }
        }
        Ok(())
    }

    pub fn find_category_by_id(&self, id: i64) -> Result<&Category, AppError> {
        self.categories
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("category {}", id)))
    }

    pub fn find_student_by_id(&self, id: i64) -> Result<&Student, AppError> {
        self.students
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("student {}", id)))
    }

    pub fn get_student_by_id(&self, id: i64) -> Option<&Student> {
        self.students.get(&id)
    }

    pub fn get_course_by_id(&self, id: i64) -> Option<&Course> {
        self.courses.get(&id)
    }

    /// First course (lowest id) with exactly this name.
    pub fn get_course_by_name(&self, name: &str) -> Option<&Course> {
        self.courses.values().find(|c| c.name == name)
    }

    fn category_mut(&mut self, id: i64) -> Result<&mut Category, AppError> {
        self.categories
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("category {}", id)))
    }

    fn course_mut(&mut self, id: i64) -> Result<&mut Course, AppError> {
        self.courses
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("course {}", id)))
    }

    fn student_mut(&mut self, id: i64) -> Result<&mut Student, AppError> {
        self.students
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("student {}", id)))
    }

    /// Number of categories below `id`, at any depth.
    pub fn sub_category_count(&self, id: i64) -> Result<usize, AppError> {
        let category = self.find_category_by_id(id)?;
        let mut total = category.children.len();
        for child in &category.children {
            total += self.sub_category_count(*child)?;
        }
        Ok(total)
    }

    /// Number of courses in `id` and every category below it.
    pub fn course_count(&self, id: i64) -> Result<usize, AppError> {
        let category = self.find_category_by_id(id)?;
        let mut total = category.courses.len();
        for child in &category.children {
            total += self.course_count(*child)?;
        }
        Ok(total)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn courses_in_category(&self, id: i64) -> Result<Vec<&Course>, AppError> {
        let category = self.find_category_by_id(id)?;
        Ok(category.courses.iter().filter_map(|c| self.courses.get(c)).collect())
    }

    pub fn courses_of_student(&self, id: i64) -> Result<Vec<&Course>, AppError> {
        let student = self.find_student_by_id(id)?;
        Ok(student.courses.iter().filter_map(|c| self.courses.get(c)).collect())
    }
}
