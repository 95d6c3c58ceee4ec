//! Record store - students, modules and registrations.

use crate::error::StoreError;
use campusgate_protocol::{Module, Student};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

/// A student together with its credential.
#[derive(Debug, Clone)]
struct StudentEntry {
    student: Student,
    password: String,
}

/// Fields that may be changed on an existing student.
#[derive(Debug, Clone, Default)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Fields that may be changed on an existing module.
#[derive(Debug, Clone, Default)]
pub struct ModuleUpdate {
    pub module_name: Option<String>,
    pub description: Option<String>,
    pub credits: Option<i64>,
}

/// Memory-only store for students and modules.
pub struct RecordStore {
    /// Students indexed by ID.
    students: DashMap<String, RwLock<StudentEntry>>,

    /// Modules indexed by code.
    modules: DashMap<String, RwLock<Module>>,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            students: DashMap::new(),
            modules: DashMap::new(),
        }
    }

    /// Creates a store holding the sample catalog and one sample student.
    pub fn seeded() -> Self {
        let store = Self::new();

        let modules = [
            (
                "CS101",
                "Introduction to Programming",
                "Learn basic programming concepts",
                3,
            ),
            (
                "CS201",
                "Data Structures",
                "Study fundamental data structures",
                4,
            ),
            ("CS301", "Database Systems", "Relational databases and SQL", 3),
        ];
        for (code, name, description, credits) in modules {
            store.modules.insert(
                code.to_string(),
                RwLock::new(Module {
                    module_code: code.to_string(),
                    module_name: name.to_string(),
                    description: description.to_string(),
                    credits,
                }),
            );
        }

        store.students.insert(
            "S001".to_string(),
            RwLock::new(StudentEntry {
                student: Student {
                    student_id: "S001".to_string(),
                    name: "John Doe".to_string(),
                    email: "john@example.com".to_string(),
                    registered_modules: Vec::new(),
                },
                password: "password123".to_string(),
            }),
        );

        tracing::debug!(
            "Seeded store: {} students, {} modules",
            store.students.len(),
            store.modules.len()
        );

        store
    }

    /// Checks a credential pair and returns the student on success.
    pub fn authenticate(&self, student_id: &str, password: &str) -> Result<Student, StoreError> {
        let entry = self
            .students
            .get(student_id)
            .ok_or(StoreError::InvalidCredentials)?;
        let entry = entry.read();
        if entry.password != password {
            return Err(StoreError::InvalidCredentials);
        }
        Ok(entry.student.clone())
    }

    /// Adds a new student.
    pub fn add_student(
        &self,
        student_id: &str,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Student, StoreError> {
        match self.students.entry(student_id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::StudentExists),
            Entry::Vacant(slot) => {
                let student = Student {
                    student_id: student_id.to_string(),
                    name: name.to_string(),
                    email: email.to_string(),
                    registered_modules: Vec::new(),
                };
                slot.insert(RwLock::new(StudentEntry {
                    student: student.clone(),
                    password: password.to_string(),
                }));
                Ok(student)
            }
        }
    }

    /// Applies the provided fields to an existing student.
    pub fn update_student(
        &self,
        student_id: &str,
        update: StudentUpdate,
    ) -> Result<Student, StoreError> {
        let entry = self
            .students
            .get(student_id)
            .ok_or(StoreError::StudentNotFound)?;
        let mut entry = entry.write();
        if let Some(name) = update.name {
            entry.student.name = name;
        }
        if let Some(email) = update.email {
            entry.student.email = email;
        }
        if let Some(password) = update.password {
            entry.password = password;
        }
        Ok(entry.student.clone())
    }

    /// Returns a student by ID.
    pub fn student(&self, student_id: &str) -> Result<Student, StoreError> {
        self.students
            .get(student_id)
            .map(|entry| entry.read().student.clone())
            .ok_or(StoreError::StudentNotFound)
    }

    /// Returns all students ordered by ID.
    pub fn students(&self) -> Vec<Student> {
        let mut students: Vec<Student> = self
            .students
            .iter()
            .map(|entry| entry.read().student.clone())
            .collect();
        students.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        students
    }

    /// Registers a student for a module. Registering twice is a no-op.
    pub fn register_module(&self, student_id: &str, module_code: &str) -> Result<(), StoreError> {
        let entry = self
            .students
            .get(student_id)
            .ok_or(StoreError::StudentNotFound)?;
        if !self.modules.contains_key(module_code) {
            return Err(StoreError::ModuleNotFound);
        }

        let mut entry = entry.write();
        let registered = &mut entry.student.registered_modules;
        if !registered.iter().any(|code| code == module_code) {
            registered.push(module_code.to_string());
        }
        Ok(())
    }

    /// Returns the modules a student is registered for, in registration order.
    /// Codes that no longer resolve to a module are skipped.
    pub fn registered_modules(&self, student_id: &str) -> Result<Vec<Module>, StoreError> {
        let codes = self.student(student_id)?.registered_modules;
        Ok(codes
            .iter()
            .filter_map(|code| self.modules.get(code).map(|m| m.read().clone()))
            .collect())
    }

    /// Adds a new module.
    pub fn add_module(&self, module: Module) -> Result<Module, StoreError> {
        match self.modules.entry(module.module_code.clone()) {
            Entry::Occupied(_) => Err(StoreError::ModuleExists),
            Entry::Vacant(slot) => {
                slot.insert(RwLock::new(module.clone()));
                Ok(module)
            }
        }
    }

    /// Applies the provided fields to an existing module.
    pub fn update_module(
        &self,
        module_code: &str,
        update: ModuleUpdate,
    ) -> Result<Module, StoreError> {
        let entry = self
            .modules
            .get(module_code)
            .ok_or(StoreError::ModuleNotFound)?;
        let mut module = entry.write();
        if let Some(name) = update.module_name {
            module.module_name = name;
        }
        if let Some(description) = update.description {
            module.description = description;
        }
        if let Some(credits) = update.credits {
            module.credits = credits;
        }
        Ok(module.clone())
    }

    /// Returns a module by code.
    pub fn module(&self, module_code: &str) -> Result<Module, StoreError> {
        self.modules
            .get(module_code)
            .map(|m| m.read().clone())
            .ok_or(StoreError::ModuleNotFound)
    }

    /// Returns all modules ordered by code.
    pub fn modules(&self) -> Vec<Module> {
        let mut modules: Vec<Module> = self.modules.iter().map(|m| m.read().clone()).collect();
        modules.sort_by(|a, b| a.module_code.cmp(&b.module_code));
        modules
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(code: &str, credits: i64) -> Module {
        Module {
            module_code: code.to_string(),
            module_name: format!("{} name", code),
            description: String::new(),
            credits,
        }
    }

    #[test]
    fn test_seeded_contents() {
        let store = RecordStore::seeded();
        let codes: Vec<String> = store.modules().into_iter().map(|m| m.module_code).collect();
        assert_eq!(codes, vec!["CS101", "CS201", "CS301"]);
        assert_eq!(store.student("S001").unwrap().name, "John Doe");
    }

    #[test]
    fn test_authenticate() {
        let store = RecordStore::seeded();
        assert_eq!(
            store.authenticate("S001", "password123").unwrap().student_id,
            "S001"
        );
        assert!(matches!(
            store.authenticate("S001", "wrong"),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("S999", "password123"),
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_add_student_rejects_duplicates() {
        let store = RecordStore::new();
        store.add_student("S100", "Ada", "ada@example.com", "pw").unwrap();
        assert!(matches!(
            store.add_student("S100", "Other", "o@example.com", "pw"),
            Err(StoreError::StudentExists)
        ));
        assert_eq!(store.students().len(), 1);
    }

    #[test]
    fn test_update_student_partial() {
        let store = RecordStore::seeded();
        let updated = store
            .update_student(
                "S001",
                StudentUpdate {
                    email: Some("jd@example.com".to_string()),
                    password: Some("newpass".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "John Doe");
        assert_eq!(updated.email, "jd@example.com");
        assert!(store.authenticate("S001", "newpass").is_ok());
        assert!(store.authenticate("S001", "password123").is_err());

        assert!(matches!(
            store.update_student("S404", StudentUpdate::default()),
            Err(StoreError::StudentNotFound)
        ));
    }

    #[test]
    fn test_register_module_is_idempotent() {
        let store = RecordStore::seeded();
        store.register_module("S001", "CS201").unwrap();
        store.register_module("S001", "CS101").unwrap();
        store.register_module("S001", "CS201").unwrap();

        let student = store.student("S001").unwrap();
        assert_eq!(student.registered_modules, vec!["CS201", "CS101"]);

        let modules = store.registered_modules("S001").unwrap();
        let codes: Vec<&str> = modules.iter().map(|m| m.module_code.as_str()).collect();
        assert_eq!(codes, vec!["CS201", "CS101"]);
    }

    #[test]
    fn test_register_module_errors() {
        let store = RecordStore::seeded();
        assert!(matches!(
            store.register_module("S404", "CS101"),
            Err(StoreError::StudentNotFound)
        ));
        assert!(matches!(
            store.register_module("S001", "XX999"),
            Err(StoreError::ModuleNotFound)
        ));
        assert!(matches!(
            store.registered_modules("S404"),
            Err(StoreError::StudentNotFound)
        ));
    }

    #[test]
    fn test_module_lifecycle() {
        let store = RecordStore::new();
        store.add_module(module("MA101", 2)).unwrap();
        assert!(matches!(
            store.add_module(module("MA101", 5)),
            Err(StoreError::ModuleExists)
        ));

        let updated = store
            .update_module(
                "MA101",
                ModuleUpdate {
                    credits: Some(6),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.credits, 6);
        assert_eq!(updated.module_name, "MA101 name");
        assert_eq!(store.module("MA101").unwrap().credits, 6);
        assert!(matches!(
            store.module("MA999"),
            Err(StoreError::ModuleNotFound)
        ));
    }
}
