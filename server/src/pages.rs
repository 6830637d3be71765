use askama::Template;
use todo_core::Todo;

/// The todo list page. Titles are HTML-escaped on render.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub todos: Vec<Todo>,
}
