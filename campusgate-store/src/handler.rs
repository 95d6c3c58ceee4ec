//! Request dispatch.

use crate::error::StoreError;
use crate::store::{ModuleUpdate, RecordStore, StudentUpdate};
use campusgate_protocol::{Action, Module, Request, Response, Value};
use std::sync::Arc;

/// Applies backend requests to the record store.
pub struct RequestHandler {
    store: Arc<RecordStore>,
}

impl RequestHandler {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Handles a request and returns a response. Never fails: unknown actions
    /// and rule violations become `success: false` responses.
    pub fn handle(&self, request: &Request) -> Response {
        let Some(action) = Action::parse(&request.action) else {
            tracing::debug!("Unknown action: {}", request.action);
            return Response::failure(format!("Unknown action: {}", request.action));
        };

        tracing::debug!("Processing action: {}", action);

        let result = match action {
            Action::StudentLogin => self.handle_student_login(request),
            Action::ViewModules | Action::ListModules => self.handle_list_modules(),
            Action::RegisterModule => self.handle_register_module(request),
            Action::ViewRegisteredModules => self.handle_view_registered_modules(request),
            Action::AddStudent => self.handle_add_student(request),
            Action::EditStudent => self.handle_edit_student(request),
            Action::ViewStudent => self.handle_view_student(request),
            Action::ListStudents => self.handle_list_students(),
            Action::AddModule => self.handle_add_module(request),
            Action::EditModule => self.handle_edit_module(request),
            Action::ViewModule => self.handle_view_module(request),
        };

        result.unwrap_or_else(|e| Response::failure(e.response_message()))
    }

    fn handle_student_login(&self, request: &Request) -> Result<Response, StoreError> {
        let student_id = required_str(request, "studentId")?;
        let password = required_str(request, "password")?;
        let student = self.store.authenticate(student_id, password)?;
        Ok(Response::ok_with("Login successful", student))
    }

    fn handle_list_modules(&self) -> Result<Response, StoreError> {
        Ok(Response::ok_with("Modules retrieved", self.store.modules()))
    }

    fn handle_register_module(&self, request: &Request) -> Result<Response, StoreError> {
        let student_id = required_str(request, "studentId")?;
        let module_code = required_str(request, "moduleCode")?;
        self.store.register_module(student_id, module_code)?;
        Ok(Response::ok("Module registered successfully"))
    }

    fn handle_view_registered_modules(&self, request: &Request) -> Result<Response, StoreError> {
        let student_id = required_str(request, "studentId")?;
        let modules = self.store.registered_modules(student_id)?;
        Ok(Response::ok_with("Registered modules retrieved", modules))
    }

    fn handle_add_student(&self, request: &Request) -> Result<Response, StoreError> {
        let student_id = required_str(request, "studentId")?;
        let password = required_str(request, "password")?;
        let name = optional_str(request, "name")?.unwrap_or_default();
        let email = optional_str(request, "email")?.unwrap_or_default();
        let student = self
            .store
            .add_student(student_id, name, email, password)?;
        Ok(Response::ok_with("Student added successfully", student))
    }

    fn handle_edit_student(&self, request: &Request) -> Result<Response, StoreError> {
        let student_id = required_str(request, "studentId")?;
        let update = StudentUpdate {
            name: optional_str(request, "name")?.map(str::to_string),
            email: optional_str(request, "email")?.map(str::to_string),
            password: optional_str(request, "password")?.map(str::to_string),
        };
        let student = self.store.update_student(student_id, update)?;
        Ok(Response::ok_with("Student updated successfully", student))
    }

    fn handle_view_student(&self, request: &Request) -> Result<Response, StoreError> {
        let student_id = required_str(request, "studentId")?;
        let student = self.store.student(student_id)?;
        Ok(Response::ok_with("Student retrieved", student))
    }

    fn handle_list_students(&self) -> Result<Response, StoreError> {
        Ok(Response::ok_with("Students retrieved", self.store.students()))
    }

    fn handle_add_module(&self, request: &Request) -> Result<Response, StoreError> {
        let module = Module {
            module_code: required_str(request, "moduleCode")?.to_string(),
            module_name: optional_str(request, "moduleName")?
                .unwrap_or_default()
                .to_string(),
            description: optional_str(request, "description")?
                .unwrap_or_default()
                .to_string(),
            credits: required_int(request, "credits")?,
        };
        let module = self.store.add_module(module)?;
        Ok(Response::ok_with("Module added successfully", module))
    }

    fn handle_edit_module(&self, request: &Request) -> Result<Response, StoreError> {
        let module_code = required_str(request, "moduleCode")?;
        let update = ModuleUpdate {
            module_name: optional_str(request, "moduleName")?.map(str::to_string),
            description: optional_str(request, "description")?.map(str::to_string),
            credits: optional_int(request, "credits")?,
        };
        let module = self.store.update_module(module_code, update)?;
        Ok(Response::ok_with("Module updated successfully", module))
    }

    fn handle_view_module(&self, request: &Request) -> Result<Response, StoreError> {
        let module_code = required_str(request, "moduleCode")?;
        let module = self.store.module(module_code)?;
        Ok(Response::ok_with("Module retrieved", module))
    }
}

/// Looks up a field, treating an explicit null as absent.
fn field<'a>(request: &'a Request, name: &str) -> Option<&'a Value> {
    request.field(name).filter(|value| !value.is_null())
}

fn optional_str<'a>(request: &'a Request, name: &'static str) -> Result<Option<&'a str>, StoreError> {
    match field(request, name) {
        None => Ok(None),
        Some(value) => value.as_str().map(Some).ok_or(StoreError::InvalidField {
            field: name,
            expected: "string",
        }),
    }
}

fn required_str<'a>(request: &'a Request, name: &'static str) -> Result<&'a str, StoreError> {
    optional_str(request, name)?.ok_or(StoreError::MissingField(name))
}

fn optional_int(request: &Request, name: &'static str) -> Result<Option<i64>, StoreError> {
    match field(request, name) {
        None => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or(StoreError::InvalidField {
            field: name,
            expected: "integer",
        }),
    }
}

fn required_int(request: &Request, name: &'static str) -> Result<i64, StoreError> {
    optional_int(request, name)?.ok_or(StoreError::MissingField(name))
}
