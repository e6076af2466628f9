/// One monitored host as shown in a list row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    /// Opaque backend identifier, empty when unknown.
    pub guid: String,
    pub kind: String,
    pub os: String,
    pub has_alert: bool,
    pub alert_title: String,
    pub alert_detail: String,
    /// Connection target for remote sessions.
    pub address: String,
}

impl Entity {
    pub fn new(name: impl Into<String>, guid: impl Into<String>, kind: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            address: name.clone(),
            name,
            guid: guid.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    pub fn with_alert(mut self, title: &str, detail: &str) -> Self {
        self.apply_alert(title, detail);
        self
    }

    /// Marks the entity as alerting. Later matches overwrite earlier ones;
    /// an empty title keeps whatever title was already recorded.
    pub fn apply_alert(&mut self, title: &str, detail: &str) {
        self.has_alert = true;
        if !title.is_empty() {
            self.alert_title = title.to_string();
        }
        self.alert_detail = detail.to_string();
    }

    pub fn status_label(&self) -> &'static str {
        if self.has_alert {
            "ALERT"
        } else {
            "OK"
        }
    }
}

/// Entities in display order, plus the reason a fetch degraded to
/// synthetic data (if it did).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    pub entities: Vec<Entity>,
    pub error: Option<String>,
}

impl EntitySet {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            error: None,
        }
    }

    /// Fixed offline dataset used whenever live data is unavailable.
    pub fn synthetic(error: impl Into<String>) -> Self {
        let host = |index: u8| {
            Entity::new(format!("server-{index}"), "", "HOST").with_os("Linux")
        };
        Self {
            entities: vec![
                host(1),
                host(2).with_alert("CPU High", "CPU > 85%"),
                host(3),
                host(4).with_alert("Memory", "Memory > 90%"),
                host(5),
            ],
            error: Some(error.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}
