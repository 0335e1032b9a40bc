/// Hands out philosopher names: the preset list first, then `#6`, `#7`, ...
#[derive(Debug, Clone, Default)]
pub struct NameSource {
    issued: usize,
}

impl NameSource {
    pub const PRESET: [&'static str; 5] = [
        "Herr mymuesli",
        "Herr Dr. Oetker",
        "Herr Seitenbacher",
        "Herr Kellogg",
        "Herr Kölln",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self) -> String {
        self.issued += 1;
        match Self::PRESET.get(self.issued - 1) {
            Some(name) => (*name).to_string(),
            None => format!("#{}", self.issued),
        }
    }
}

impl Iterator for NameSource {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_name())
    }
}
