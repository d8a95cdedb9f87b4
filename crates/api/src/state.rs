use mongodb::Database;
use sitedesk_config::Settings;
use sitedesk_services::{
    AuthService, LogNotifier, Notifier,
    dao::{
        invitation::InvitationDao, project::ProjectDao, tenant::TenantDao, user::UserDao,
    },
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub tenants: Arc<TenantDao>,
    pub invitations: Arc<InvitationDao>,
    pub projects: Arc<ProjectDao>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let tenants = Arc::new(TenantDao::new(&db));
        let invitations = Arc::new(InvitationDao::new(&db, &settings.invitation));
        let projects = Arc::new(ProjectDao::new(&db));
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

        Self {
            db,
            settings,
            auth,
            users,
            tenants,
            invitations,
            projects,
            notifier,
        }
    }
}
