//! Typed messages exchanged with the record store.

use crate::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Actions understood by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Student operations
    StudentLogin,
    ViewModules,
    RegisterModule,
    ViewRegisteredModules,

    // Student administration
    AddStudent,
    EditStudent,
    ViewStudent,
    ListStudents,

    // Module administration
    AddModule,
    EditModule,
    ViewModule,
    ListModules,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::StudentLogin,
        Action::ViewModules,
        Action::RegisterModule,
        Action::ViewRegisteredModules,
        Action::AddStudent,
        Action::EditStudent,
        Action::ViewStudent,
        Action::ListStudents,
        Action::AddModule,
        Action::EditModule,
        Action::ViewModule,
        Action::ListModules,
    ];

    /// Looks up an action by its wire name. Matching is exact.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == name)
    }

    /// Returns the wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::StudentLogin => "STUDENT_LOGIN",
            Action::ViewModules => "VIEW_MODULES",
            Action::RegisterModule => "REGISTER_MODULE",
            Action::ViewRegisteredModules => "VIEW_REGISTERED_MODULES",
            Action::AddStudent => "ADD_STUDENT",
            Action::EditStudent => "EDIT_STUDENT",
            Action::ViewStudent => "VIEW_STUDENT",
            Action::ListStudents => "LIST_STUDENTS",
            Action::AddModule => "ADD_MODULE",
            Action::EditModule => "EDIT_MODULE",
            Action::ViewModule => "VIEW_MODULE",
            Action::ListModules => "LIST_MODULES",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request sent to the record store.
///
/// `action` stays a free-form string so that unknown actions reach the store
/// and are answered there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Action tag selecting the store operation.
    pub action: String,

    /// Action-specific fields.
    #[serde(default)]
    pub data: Map,
}

impl Request {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map) -> Self {
        self.data = data;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// A student record as seen outside the store. Credentials never leave the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub registered_modules: Vec<String>,
}

/// A module record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub module_code: String,
    pub module_name: String,
    pub description: String,
    pub credits: i64,
}

/// Response body returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    List(Vec<Payload>),
    Student(Student),
    Module(Module),
}

impl From<Student> for Payload {
    fn from(student: Student) -> Self {
        Payload::Student(student)
    }
}

impl From<Module> for Payload {
    fn from(module: Module) -> Self {
        Payload::Module(module)
    }
}

impl<T: Into<Payload>> From<Vec<T>> for Payload {
    fn from(items: Vec<T>) -> Self {
        Payload::List(items.into_iter().map(Into::into).collect())
    }
}

/// Response returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the action succeeded.
    pub success: bool,

    /// Human-readable outcome.
    pub message: String,

    /// Optional result body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, data: impl Into<Payload>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module() -> Module {
        Module {
            module_code: "CS101".to_string(),
            module_name: "Introduction to Programming".to_string(),
            description: "Learn basic programming concepts".to_string(),
            credits: 3,
        }
    }

    #[test]
    fn test_action_names() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
        assert_eq!(Action::parse("student_login"), None);
        assert_eq!(Action::parse("FOOBAR"), None);
        assert_eq!(Action::RegisterModule.to_string(), "REGISTER_MODULE");
    }

    #[test]
    fn test_request_serialization() {
        let request = Request::new("STUDENT_LOGIN")
            .with_field("studentId", "S001")
            .with_field("password", "password123");

        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"action":"STUDENT_LOGIN","data":{"password":"password123","studentId":"S001"}}"#
        );

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_request_without_data() {
        let parsed: Request = serde_json::from_str(r#"{"action":"LIST_MODULES"}"#).unwrap();
        assert!(parsed.data.is_empty());
        assert!(parsed.field("anything").is_none());
    }

    #[test]
    fn test_response_roundtrip() {
        let response = Response::ok_with("Modules retrieved", vec![sample_module()]);
        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, response);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_failure_omits_data() {
        let json = serde_json::to_string(&Response::failure("Module not found")).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"Module not found"}"#);
    }

    #[test]
    fn test_payload_from_vec() {
        let payload: Payload = vec![sample_module()].into();
        match payload {
            Payload::List(items) => {
                assert_eq!(items.len(), 1);
                assert!(matches!(items[0], Payload::Module(_)));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
