use lectern::permissions::PermissionKind;
use lectern::storage;
use sea_orm::DatabaseConnection;

/// Builder for creating test catalog records
pub struct InfoMatBuilder {
    input: storage::NewInfoMat,
}

impl InfoMatBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            input: storage::NewInfoMat {
                title: title.to_string(),
                authors: vec!["John Doe".to_string()],
                publication_year: "2023".to_string(),
                cover_image: "cover_image_url".to_string(),
                abstract_text: "This is a sample book abstract.".to_string(),
                matters: vec!["Science".to_string()],
                sub_matters: None,
                availability: None,
                address: None,
                summary: None,
                tags: vec!["Sample".to_string()],
                number_of_pages: "200".to_string(),
                isbn: "1234567890".to_string(),
                issn: "9876543210".to_string(),
                material_type: "Book".to_string(),
                language: "PT-BR".to_string(),
                publisher: "Example Publishing".to_string(),
                volume: 1,
                series: "Sample Series".to_string(),
                edition: "1st Edition".to_string(),
                reprint_update: "2023-09-20".to_string(),
            },
        }
    }

    pub fn with_matters(mut self, matters: &[&str]) -> Self {
        self.input.matters = matters.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.input.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_publication_year(mut self, year: &str) -> Self {
        self.input.publication_year = year.to_string();
        self
    }

    pub fn with_publisher(mut self, publisher: &str) -> Self {
        self.input.publisher = publisher.to_string();
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> storage::InfoMat {
        storage::create_info_mat(db, self.input)
            .await
            .expect("Failed to create test info mat")
    }
}

/// Builder for creating test principals with optional grants
pub struct PrincipalBuilder {
    email: String,
    disabled: bool,
    grants: Vec<(PermissionKind, Option<i64>)>,
}

impl PrincipalBuilder {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            disabled: false,
            grants: Vec::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_grant(mut self, kind: PermissionKind) -> Self {
        self.grants.push((kind, None));
        self
    }

    pub fn with_expiring_grant(mut self, kind: PermissionKind, expires_at: i64) -> Self {
        self.grants.push((kind, Some(expires_at)));
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> storage::Principal {
        let principal = storage::upsert_principal_by_email(db, &self.email)
            .await
            .expect("Failed to create test principal");

        for (kind, expires_at) in self.grants {
            storage::register_permission(db, principal.id, kind, expires_at)
                .await
                .expect("Failed to register test grant");
        }

        if self.disabled {
            storage::set_principal_disabled(db, &self.email, true)
                .await
                .expect("Failed to disable test principal")
                .expect("Principal not found")
        } else {
            principal
        }
    }
}
