//! Top-level navigation: the tabs and the service catalogue.

use franc_portal_forms::Service;
use serde::Serialize;

/// Tabs shown in the header.
pub const TABS: [&str; 2] = ["Home", "Service Catalogue"];

/// One orderable service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogueEntry {
    /// Display title
    pub title: &'static str,
    /// Service to open
    pub service: Service,
    /// Help topic describing the service
    pub help_topic: &'static str,
    /// Help topic with form instructions
    pub instructions_topic: &'static str,
    /// Help topic shown after an accepted request
    pub next_steps_topic: &'static str,
}

impl From<Service> for CatalogueEntry {
    fn from(service: Service) -> Self {
        Self {
            title: service.title(),
            service,
            help_topic: service.help_topic(),
            instructions_topic: service.instructions_topic(),
            next_steps_topic: service.next_steps_topic(),
        }
    }
}

/// Tabs plus catalogue.
#[derive(Debug, Clone, Serialize)]
pub struct Navigation {
    /// Header tabs
    pub tabs: Vec<&'static str>,
    /// Services in display order
    pub catalogue: Vec<CatalogueEntry>,
}

impl Navigation {
    /// The portal's navigation
    #[must_use]
    pub fn portal() -> Self {
        Self {
            tabs: TABS.to_vec(),
            catalogue: [
                Service::DataCenterDeployment,
                Service::PopDeployment,
                Service::DeviceConnection,
            ]
            .into_iter()
            .map(CatalogueEntry::from)
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_lists_every_service_with_its_topics() {
        let navigation = Navigation::portal();
        assert_eq!(navigation.tabs, vec!["Home", "Service Catalogue"]);

        let titles: Vec<_> = navigation.catalogue.iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Deploy Data Center", "Deploy PoP", "Connection Request"]);

        let dc = &navigation.catalogue[0];
        assert_eq!(dc.help_topic, "deploy-dc");
        assert_eq!(dc.instructions_topic, "deploy-dc-instructions");
        assert_eq!(dc.next_steps_topic, "dc-next-steps");
        assert_eq!(navigation.catalogue[2].help_topic, "connect-device");
    }
}
