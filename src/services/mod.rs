// Business logic services

pub mod attendance_service;
pub mod background_job_service;
pub mod class_service;
pub mod equipment_service;
pub mod feedback_service;
pub mod flash_service;
pub mod membership_service;
pub mod notification_service;
pub mod payment_service;
pub mod progress_service;
pub mod qr_service;
pub mod trainer_service;
pub mod training_session_service;
pub mod user_service;

pub use attendance_service::AttendanceService;
pub use background_job_service::BackgroundJobService;
pub use class_service::ClassService;
pub use equipment_service::EquipmentService;
pub use feedback_service::FeedbackService;
pub use flash_service::{FlashLevel, FlashMessage, FlashStore};
pub use membership_service::MembershipService;
pub use notification_service::NotificationService;
pub use payment_service::PaymentService;
pub use progress_service::ProgressService;
pub use qr_service::{QrProvider, QrRenderer, QrSigner};
pub use trainer_service::TrainerService;
pub use training_session_service::TrainingSessionService;
pub use user_service::UserService;
