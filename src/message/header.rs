//! Header storage shared by messages, parts and files.

/// An ordered set of header fields.
///
/// Names keep the case they were set with and are looked up
/// case-insensitively. A field holds one or more values; all values of a
/// field render comma-joined on a single line.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<Field>,
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    values: Vec<String>,
}

impl Headers {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Headers { fields: Vec::new() }
    }

    /// Replaces all values of `name`.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.find_mut(&name) {
            Some(field) => field.values = values,
            None => self.fields.push(Field { name, values }),
        }
    }

    /// Appends values to `name`, keeping existing ones.
    pub fn add(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.find_mut(&name) {
            Some(field) => field.values.extend(values),
            None => self.fields.push(Field { name, values }),
        }
    }

    /// Returns the values of `name`, empty when the field is not set.
    pub fn get(&self, name: &str) -> &[String] {
        self.find(name).map(|f| f.values.as_slice()).unwrap_or(&[])
    }

    /// Returns whether `name` is set.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Removes `name`, returning whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let len = self.fields.len();
        self.fields.retain(|f| !f.name.eq_ignore_ascii_case(name));
        self.fields.len() != len
    }

    /// Removes every field.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Iterates fields in insertion order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.values.as_slice()))
    }

    fn find(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}
