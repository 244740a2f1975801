use crate::session::Session;

/// The hierarchy itself is printed while the session initializes.
pub fn show_structure(session: &Session) {
    println!(
        "{} image(s), {} external parent(s), {} released",
        session.graph.len(),
        session.graph.external_parents().len(),
        session.catalog.len()
    );
}
