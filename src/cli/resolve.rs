use quiver::resolve::render_plan;

use super::{block_on, fail, open_session, parse_requirement};

/// Artifacts reached above this depth count as selected by the user.
pub const DEFAULT_CUTOFF_DEPTH: usize = 2;

pub fn cmd_resolve(requirements: Vec<String>, depth: usize) {
    let session = open_session();

    let requirements = if requirements.is_empty() {
        match session.project() {
            Some(project) => project.requirements(),
            None => fail("no requirements given and no quiver.toml found"),
        }
    } else {
        requirements
            .iter()
            .map(|arg| parse_requirement(arg).unwrap_or_else(|e| fail(e)))
            .collect()
    };
    if requirements.is_empty() {
        println!("Nothing to resolve.");
        return;
    }

    let plan = match block_on(session.resolve(&requirements, depth)) {
        Ok(plan) => plan,
        Err(e) => fail(e),
    };
    print!("{}", render_plan(&plan, session.scope().as_ref()));
    println!("\n{} artifact(s) to install.", plan.len());
}
