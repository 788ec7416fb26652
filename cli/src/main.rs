use clap::{Parser, Subcommand, ValueEnum};
use coursehub::error::{AppError, AppResult};
use coursehub::model::entity::{
    Course, CourseCreate, Department, DepartmentCreate, Lesson, LessonCreate, LessonType, Section,
    SectionCreate, Skill, SkillCreate, UserEntity, UserEntityCreateUpdate,
};
use coursehub::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use coursehub::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for seeding the coursehub database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage departments
    Department {
        #[command(subcommand)]
        action: NamedCommands,
    },

    /// Manage skills
    Skill {
        #[command(subcommand)]
        action: NamedCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage sections
    Section {
        #[command(subcommand)]
        action: SectionCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    Admin,
    Trainer,
    Trainee,
}

impl From<RoleArg> for UserRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => UserRole::Admin,
            RoleArg::Trainer => UserRole::Trainer,
            RoleArg::Trainee => UserRole::Trainee,
        }
    }
}

/// Exams need question sets and are created through the API.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LessonKind {
    Video,
    Document,
    Assignment,
    LiveClass,
    Feedback,
}

impl From<LessonKind> for LessonType {
    fn from(value: LessonKind) -> Self {
        match value {
            LessonKind::Video => LessonType::Video,
            LessonKind::Document => LessonType::Document,
            LessonKind::Assignment => LessonType::Assignment,
            LessonKind::LiveClass => LessonType::LiveClass,
            LessonKind::Feedback => LessonType::Feedback,
        }
    }
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_enum, default_value = "trainee")]
        role: RoleArg,
        /// Department name to place the user in
        #[arg(long)]
        department: Option<String>,
    },
}

/// Departments and skills only carry a name
#[derive(Subcommand, Debug)]
pub enum NamedCommands {
    Add {
        #[arg(long)]
        name: String,
    },
}

/// Course management
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        /// Username of the trainer authoring the course
        #[arg(long)]
        author: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = false)]
        certificate: bool,
    },
}

/// Section management
#[derive(Subcommand, Debug)]
pub enum SectionCommands {
    Add {
        /// Course title to attach the section to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

/// Lesson management
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Section title to attach the lesson to
        #[arg(long)]
        section_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, value_enum)]
        lesson_type: LessonKind,
        /// Path to a text file with the lesson description
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        content_url: Option<String>,
        #[arg(long)]
        duration_seconds: Option<i32>,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

async fn id_by(mm: &ModelManager, query: &'static str, value: &str) -> AppResult<uuid::Uuid> {
    let id = sqlx::query_scalar(query)
        .bind(value)
        .fetch_one(mm.executor())
        .await
        .map_err(DatabaseError::SqlxError)?;
    Ok(id)
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let url = std::env::var("DATABASE_URL")
        .map_err(|e| AppError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, e)))?;
    let mm = ModelManager::new(DbConnection::connect(&url)?);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add { username, password, email, role, department } => {
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        username,
                        email,
                        password_hash: coursehub::auth::hash_password(&password)?,
                    },
                )
                .await?;

                let department_id = match department {
                    Some(name) => Some(id_by(&mm, "SELECT id FROM departments WHERE name = $1", &name).await?),
                    None => None,
                };
                let user = user.assign(&mm, &actor, role.into(), department_id).await?;
                println!("User created: {:?}", user);
            }
        },

        Commands::Department { action } => match action {
            NamedCommands::Add { name } => {
                let department = Department::create(&mm, &actor, DepartmentCreate { name, is_active: None }).await?;
                println!("Department created: {:?}", department);
            }
        },

        Commands::Skill { action } => match action {
            NamedCommands::Add { name } => {
                let skill = Skill::create(
                    &mm,
                    &actor,
                    SkillCreate {
                        name,
                        description: String::new(),
                        is_active: None,
                    },
                )
                .await?;
                println!("Skill created: {:?}", skill);
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add { author, title, description, certificate } => {
                let author = UserEntity::find_by_username(&mm, &actor, &author)
                    .await?
                    .ok_or(DatabaseError::Validation(format!("unknown user `{author}`")))?;
                let author = AuthenticatedUser::new(author.id(), author.role());

                let course = Course::create(
                    &mm,
                    &author,
                    CourseCreate {
                        title,
                        description,
                        group_id: None,
                        certificate_enabled: Some(certificate),
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }
        },

        Commands::Section { action } => match action {
            SectionCommands::Add { course_title, title, order_index } => {
                let course_id = id_by(&mm, "SELECT id FROM courses WHERE title = $1", &course_title).await?;
                let section = Section::create(&mm, &actor, SectionCreate { course_id, title, order_index }).await?;
                println!("Section created: {:?}", section);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                section_title,
                title,
                lesson_type,
                file,
                content_url,
                duration_seconds,
                order_index,
            } => {
                let section_id = id_by(&mm, "SELECT id FROM sections WHERE title = $1", &section_title).await?;
                let description = match file {
                    Some(path) => std::fs::read_to_string(path)?,
                    None => String::new(),
                };

                let lesson = Lesson::create(
                    &mm,
                    &actor,
                    LessonCreate {
                        section_id,
                        title,
                        description,
                        lesson_type: lesson_type.into(),
                        order_index,
                        is_mandatory: None,
                        content_url,
                        duration_seconds,
                        start_date: None,
                    },
                )
                .await?;
                println!("Lesson created: {:?}", lesson);
            }
        },
    }

    Ok(())
}
