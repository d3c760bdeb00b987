//! HTML page controllers served through the front controller.

use crate::engine::Engine;
use crate::error::AppError;
use crate::framework::{escape_html, Page, Request, RouteTable, Timed, View};
use crate::state::AppState;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{json, Value};

fn render(state: &AppState, template: &str, title: &str, context: Value) -> Result<Page, AppError> {
    Ok(Page::ok(state.templates.render_page(template, title, &context)?))
}

fn post_only() -> Page {
    Page::with_status(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed")
}

fn query_pair(key: &str, value: &str) -> String {
    serde_urlencoded::to_string([(key, value)]).unwrap_or_default()
}

/// Distance from the category to the root of its tree.
fn depth(engine: &Engine, mut id: i64) -> usize {
    let mut depth = 0;
    while let Some(parent) = engine.find_category_by_id(id).ok().and_then(|c| c.parent) {
        depth += 1;
        id = parent;
        if depth > 64 {
            break;
        }
    }
    depth
}

fn category_list_page(state: &AppState, engine: &Engine) -> Result<Page, AppError> {
    let mut rows = String::new();
    for category in engine.categories() {
        let Some(id) = category.id else { continue };
        rows.push_str(&format!(
            "<tr><td>{}<a href=\"/course-list/?id={}\">{}</a></td><td>{}</td><td>{}</td></tr>\n",
            "&nbsp;&nbsp;".repeat(depth(engine, id)),
            id,
            escape_html(&category.name),
            engine.sub_category_count(id)?,
            engine.course_count(id)?,
        ));
    }
    render(state, "category_list.html", "Categories", json!({ "rows": rows }))
}

fn course_list_page(state: &AppState, engine: &Engine, category_id: i64) -> Result<Page, AppError> {
    let category = engine.find_category_by_id(category_id)?;
    let mut rows = String::new();
    for course in engine.courses_in_category(category_id)? {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td><a href=\"/course-copy/?{}\">copy</a></td></tr>\n",
            escape_html(&course.name),
            course.kind,
            course.students.len(),
            escape_html(&query_pair("name", &course.name)),
        ));
    }
    render(
        state,
        "course_list.html",
        "Courses",
        json!({ "name": category.name, "id": category_id, "rows": rows }),
    )
}

fn student_list_page(state: &AppState, engine: &Engine) -> Result<Page, AppError> {
    let mut rows = String::new();
    for student in engine.students() {
        let Some(id) = student.id else { continue };
        rows.push_str(&format!(
            "<tr><td><a href=\"/student-course-list/?id={}\">{}</a></td><td>{}</td><td><a href=\"/course-select/?student_id={}\">join a course</a></td></tr>\n",
            id,
            escape_html(&student.name),
            student.course_count(),
            id,
        ));
    }
    render(state, "student_list.html", "Students", json!({ "rows": rows }))
}

fn student_course_list_page(state: &AppState, engine: &Engine, student_id: i64) -> Result<Page, AppError> {
    let student = engine.find_student_by_id(student_id)?;
    let rows: String = engine
        .courses_of_student(student_id)?
        .iter()
        .map(|c| format!("<li>{} ({})</li>\n", escape_html(&c.name), c.kind))
        .collect();
    render(
        state,
        "student_course_list.html",
        "Student courses",
        json!({ "name": student.name, "id": student_id, "rows": rows }),
    )
}

pub struct Index;

#[async_trait]
impl View for Index {
    async fn call(&self, state: &AppState, _request: &Request) -> Result<Page, AppError> {
        render(state, "index.html", "Home", json!({}))
    }
}

pub struct About;

#[async_trait]
impl View for About {
    async fn call(&self, state: &AppState, _request: &Request) -> Result<Page, AppError> {
        render(state, "about.html", "About", json!({}))
    }
}

pub struct Contact;

#[async_trait]
impl View for Contact {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        render(state, "contact.html", "Contacts", json!({ "date": request.extra("date") }))
    }
}

pub struct CategoryList;

#[async_trait]
impl View for CategoryList {
    async fn call(&self, state: &AppState, _request: &Request) -> Result<Page, AppError> {
        let engine = state.engine.lock().await;
        category_list_page(state, &engine)
    }
}

pub struct CategoryCreate;

#[async_trait]
impl View for CategoryCreate {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        let mut engine = state.engine.lock().await;
        if request.is_post() {
            let name = request.field("name").unwrap_or_default();
            let parent = match request.field("category_id").map(str::trim) {
                None | Some("") => None,
                Some(_) => Some(request.field_i64("category_id")?),
            };
            engine.add_category(name, parent).await?;
            return category_list_page(state, &engine);
        }
        let options: String = engine
            .categories()
            .filter_map(|c| c.id.map(|id| (id, &c.name)))
            .map(|(id, name)| format!("<option value=\"{}\">{}</option>\n", id, escape_html(name)))
            .collect();
        render(state, "category_create.html", "New category", json!({ "options": options }))
    }
}

pub struct CourseList;

#[async_trait]
impl View for CourseList {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        let category_id = request.param_i64("id")?;
        let engine = state.engine.lock().await;
        course_list_page(state, &engine, category_id)
    }
}

pub struct CourseCreate;

#[async_trait]
impl View for CourseCreate {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        let mut engine = state.engine.lock().await;
        if request.is_post() {
            let category_id = request.field_i64("category_id")?;
            let name = request.field("name").unwrap_or_default();
            let kind = request.field("kind").unwrap_or("record");
            engine.add_course(kind, name, category_id).await?;
            return course_list_page(state, &engine, category_id);
        }
        let category_id = request.param_i64("id")?;
        let category = engine.find_category_by_id(category_id)?;
        render(
            state,
            "course_create.html",
            "New course",
            json!({ "name": category.name, "id": category_id }),
        )
    }
}

pub struct CourseCopy;

#[async_trait]
impl View for CourseCopy {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        let name = request
            .param("name")
            .ok_or_else(|| AppError::BadRequest("missing 'name'".into()))?;
        let mut engine = state.engine.lock().await;
        let id = engine.copy_course(name).await?;
        let category_id = engine
            .get_course_by_id(id)
            .map(|c| c.category_id)
            .ok_or_else(|| AppError::NotFound(format!("course {}", id)))?;
        course_list_page(state, &engine, category_id)
    }
}

/// Courses a student can still join, each with a join button.
pub struct CourseListForSelect;

#[async_trait]
impl View for CourseListForSelect {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        let student_id = request.param_i64("student_id")?;
        let engine = state.engine.lock().await;
        let student = engine.find_student_by_id(student_id)?;
        let mut rows = String::new();
        for course in engine.courses().filter(|c| !c.students.contains(&student_id)) {
            let Some(course_id) = course.id else { continue };
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td><form method=\"post\" action=\"/course-add-student/\">\
                 <input type=\"hidden\" name=\"course_id\" value=\"{}\">\
                 <input type=\"hidden\" name=\"student_id\" value=\"{}\">\
                 <button type=\"submit\">join</button></form></td></tr>\n",
                escape_html(&course.name),
                course.kind,
                course_id,
                student_id,
            ));
        }
        render(
            state,
            "course_select.html",
            "Join a course",
            json!({ "name": student.name, "rows": rows }),
        )
    }
}

pub struct CourseAddStudent;

#[async_trait]
impl View for CourseAddStudent {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        if !request.is_post() {
            return Ok(post_only());
        }
        let course_id = request.field_i64("course_id")?;
        let student_id = request.field_i64("student_id")?;
        let mut engine = state.engine.lock().await;
        engine.enroll(course_id, student_id).await?;
        student_course_list_page(state, &engine, student_id)
    }
}

pub struct StudentList;

#[async_trait]
impl View for StudentList {
    async fn call(&self, state: &AppState, _request: &Request) -> Result<Page, AppError> {
        let engine = state.engine.lock().await;
        student_list_page(state, &engine)
    }
}

pub struct StudentCreate;

#[async_trait]
impl View for StudentCreate {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        if !request.is_post() {
            return render(state, "student_create.html", "New student", json!({}));
        }
        let name = request.field("name").unwrap_or_default();
        let mut engine = state.engine.lock().await;
        engine.add_student(name).await?;
        student_list_page(state, &engine)
    }
}

pub struct StudentCourseList;

#[async_trait]
impl View for StudentCourseList {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        let student_id = request.param_i64("id")?;
        let engine = state.engine.lock().await;
        student_course_list_page(state, &engine, student_id)
    }
}

/// The site's pages. List views are wrapped in `Timed`.
pub fn default_routes() -> RouteTable {
    RouteTable::new()
        .route("/", Index)
        .route("/index/", Index)
        .route("/about/", About)
        .route("/contact/", Contact)
        .route("/category-list/", Timed::new("category-list", CategoryList))
        .route("/category-create/", CategoryCreate)
        .route("/course-list/", Timed::new("course-list", CourseList))
        .route("/course-create/", CourseCreate)
        .route("/course-copy/", CourseCopy)
        .route("/course-select/", CourseListForSelect)
        .route("/course-add-student/", CourseAddStudent)
        .route("/student-list/", Timed::new("student-list", StudentList))
        .route("/student-create/", StudentCreate)
        .route("/student-course-list/", StudentCourseList)
}
