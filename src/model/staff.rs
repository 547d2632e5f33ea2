//! Staff member model.
//!
//! Staff members are the people being rostered. Each carries the
//! department it belongs to, the qualifications it holds, and an active
//! flag; inactive members are excluded from the search space entirely.
//! All fields are read-only during an optimization run.

use serde::{Deserialize, Serialize};

/// A staff member eligible for roster assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    /// Unique staff identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Department the member belongs to.
    pub department: String,
    /// Optional squad or team within the department.
    pub squad: Option<String>,
    /// Optional working-pattern reference (e.g. "3-shift-rotation").
    pub working_pattern: Option<String>,
    /// Qualifications held (e.g. "forklift", "first-aid").
    pub qualifications: Vec<String>,
    /// Whether this member participates in rostering.
    pub active: bool,
}

impl Staff {
    /// Creates an active staff member with no qualifications.
    pub fn new(id: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            department: department.into(),
            squad: None,
            working_pattern: None,
            qualifications: Vec::new(),
            active: true,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the squad.
    pub fn with_squad(mut self, squad: impl Into<String>) -> Self {
        self.squad = Some(squad.into());
        self
    }

    /// Sets the working-pattern reference.
    pub fn with_working_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.working_pattern = Some(pattern.into());
        self
    }

    /// Adds a qualification.
    pub fn with_qualification(mut self, qualification: impl Into<String>) -> Self {
        self.qualifications.push(qualification.into());
        self
    }

    /// Marks the member inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this member holds a given qualification.
    pub fn has_qualification(&self, name: &str) -> bool {
        self.qualifications.iter().any(|q| q == name)
    }

    /// Whether this member holds every qualification in `required`.
    pub fn holds_all(&self, required: &[String]) -> bool {
        required.iter().all(|q| self.has_qualification(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_builder() {
        let s = Staff::new("S1", "logistics")
            .with_name("Kim")
            .with_squad("alpha")
            .with_qualification("forklift")
            .with_qualification("first-aid");

        assert_eq!(s.id, "S1");
        assert_eq!(s.department, "logistics");
        assert_eq!(s.squad.as_deref(), Some("alpha"));
        assert!(s.active);
        assert!(s.has_qualification("forklift"));
        assert!(!s.has_qualification("crane"));
    }

    #[test]
    fn test_holds_all() {
        let s = Staff::new("S1", "ops")
            .with_qualification("a")
            .with_qualification("b");

        assert!(s.holds_all(&["a".to_string()]));
        assert!(s.holds_all(&["a".to_string(), "b".to_string()]));
        assert!(!s.holds_all(&["a".to_string(), "c".to_string()]));
        assert!(s.holds_all(&[]), "empty requirement is always satisfied");
    }

    #[test]
    fn test_inactive() {
        let s = Staff::new("S2", "ops").inactive();
        assert!(!s.active);
    }
}
