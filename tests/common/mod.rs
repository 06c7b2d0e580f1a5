//! Shared instance builders for integration tests

#![allow(dead_code)]

use octofhir_invariants::ResourceNode;

pub fn string(value: &str) -> ResourceNode {
    ResourceNode::primitive("string", value)
}

pub fn code(value: &str) -> ResourceNode {
    ResourceNode::primitive("code", value)
}

pub fn human_name(family: &str) -> ResourceNode {
    ResourceNode::new("HumanName").with_child("family", string(family))
}

pub fn contact_point(system: Option<&str>, value: &str) -> ResourceNode {
    let mut node = ResourceNode::new("ContactPoint");
    if let Some(system) = system {
        node.add_child("system", code(system));
    }
    node.add_child("value", string(value));
    node
}

/// Patient whose contacts are given as (has name, has telecom) pairs
pub fn patient_with_contacts(contacts: &[(bool, bool)]) -> ResourceNode {
    let contacts = contacts.iter().map(|(name, telecom)| {
        let mut contact = ResourceNode::new("BackboneElement");
        if *name {
            contact.add_child("name", human_name("Contact"));
        }
        if *telecom {
            contact.add_child("telecom", contact_point(Some("phone"), "555-0100"));
        }
        contact
    });
    ResourceNode::new("Patient")
        .with_child("active", ResourceNode::primitive("boolean", true))
        .with_children("name", vec![human_name("Doe")])
        .with_children("contact", contacts.collect::<Vec<_>>())
}

/// Bundle of `count` patients, every third one with a contact lacking details
pub fn patient_bundle(count: usize) -> ResourceNode {
    let entries = (0..count).map(|i| {
        let patient = if i % 3 == 0 {
            patient_with_contacts(&[(true, false), (false, false)])
        } else {
            patient_with_contacts(&[(true, true)])
        };
        ResourceNode::new("BackboneElement").with_child("resource", patient)
    });
    ResourceNode::new("Bundle")
        .with_child("type", code("collection"))
        .with_children("entry", entries.collect::<Vec<_>>())
}
