pub mod fixtures;

#[cfg(test)]
mod invitation_tests;
#[cfg(test)]
mod rbac_tests;
