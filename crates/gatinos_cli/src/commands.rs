//! Argument definitions and dispatch to core services.

use crate::render;
use crate::CliResult;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use gatinos_core::model::records::{CaptureId, CaptureUpdate, IllnessId, PhotoId, ReportId};
use gatinos_core::{
    AccessService, CatAction, CatService, CatState, CatUpdate, Clock, ColonyService,
    ColonyUpdate, Config, Connection, DateRange, GrantPolicy, HealthService, LifecycleService,
    Locale, NewCat, NewColony, NewPhoto, NewReport, NewUser, PresenceService, RecordService,
    ReportUpdate, Sex, SqliteStore, SystemClock, User, VaccineCatalog,
};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gatinos", version, about = "Cat colony registry")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// SQLite database file (overrides `[database] path`)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(subcommand)]
    Colony(ColonyCommand),
    #[command(subcommand)]
    Cat(CatCommand),
    /// Apply a life-cycle action to a cat
    Act(ActArgs),
    /// Move idle cats to missing or forgotten
    Sweep,
    #[command(subcommand)]
    Activity(ActivityCommand),
    #[command(subcommand)]
    Sighting(SightingCommand),
    #[command(subcommand)]
    Feeding(FeedingCommand),
    #[command(subcommand)]
    Photo(PhotoCommand),
    #[command(subcommand)]
    Report(ReportCommand),
    #[command(subcommand)]
    Capture(CaptureCommand),
    #[command(subcommand)]
    Illness(IllnessCommand),
    #[command(subcommand)]
    Vaccine(VaccineCommand),
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Groups(GroupsCommand),
}

#[derive(Subcommand)]
pub enum ColonyCommand {
    Add {
        name: String,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Days a cat stays active after its last event
        #[arg(long)]
        active_days: Option<u32>,
    },
    List,
    Show {
        slug: String,
    },
    Update {
        slug: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        active_days: Option<u32>,
    },
    Delete {
        slug: String,
    },
    /// Cats referenced by events in the active window
    Active {
        slug: String,
        #[arg(long, value_parser = parse_date)]
        since: Option<NaiveDate>,
    },
    Missing {
        slug: String,
    },
    Dead {
        slug: String,
    },
    /// Active cats split by whether they were sighted on a day
    Sightings {
        slug: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
pub enum CatCommand {
    Add {
        colony: String,
        name: String,
        /// `M` or `H`
        #[arg(long, value_parser = parse_sex)]
        sex: Sex,
        #[arg(long, default_value = "")]
        color: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Name of the neighbour who owns the cat
        #[arg(long)]
        neighbour: Option<String>,
    },
    /// Cats of a colony
    List {
        colony: String,
        #[arg(long)]
        with_neighbours: bool,
    },
    /// Cats in one life-cycle state across colonies
    InState {
        #[arg(value_parser = parse_state)]
        state: CatState,
    },
    Show {
        slug: String,
    },
    Update {
        slug: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        ugly: Option<bool>,
        /// Photo id to use as portrait
        #[arg(long)]
        portrait: Option<PhotoId>,
    },
    Delete {
        slug: String,
    },
    /// Actions the user may apply now
    Actions {
        slug: String,
        #[arg(long = "as", value_name = "USER")]
        username: String,
    },
}

#[derive(Args)]
pub struct ActArgs {
    #[arg(value_parser = parse_action)]
    action: CatAction,
    slug: String,
    #[arg(long = "as", value_name = "USER")]
    username: String,
}

#[derive(Subcommand)]
pub enum ActivityCommand {
    Colony(ActivityArgs),
    Cat(ActivityArgs),
}

#[derive(Args)]
pub struct ActivityArgs {
    slug: String,
    /// Last day of the window (defaults to today)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    #[arg(long, value_parser = parse_locale, default_value = "es")]
    locale: Locale,
}

#[derive(Subcommand)]
pub enum SightingCommand {
    Toggle {
        cat: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long = "as", value_name = "USER")]
        username: String,
    },
}

#[derive(Subcommand)]
pub enum FeedingCommand {
    Toggle {
        colony: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long = "as", value_name = "USER")]
        username: String,
    },
    Schedule {
        colony: String,
        #[arg(long, value_parser = parse_date)]
        from: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        to: NaiveDate,
    },
}

#[derive(Subcommand)]
pub enum PhotoCommand {
    Add {
        colony: String,
        file: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        ugly: bool,
        /// Tagged cat; repeatable
        #[arg(long = "cat")]
        cats: Vec<String>,
        #[arg(long = "as", value_name = "USER")]
        username: String,
    },
    List {
        colony: String,
        /// Hide ugly photos
        #[arg(long)]
        showcase: bool,
    },
    Tag {
        id: PhotoId,
        cat: String,
    },
    Untag {
        id: PhotoId,
        cat: String,
    },
    Delete {
        id: PhotoId,
    },
}

#[derive(Subcommand)]
pub enum ReportCommand {
    Add {
        colony: String,
        title: String,
        #[arg(long)]
        body: Option<String>,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Mentioned cat; repeatable
        #[arg(long = "cat")]
        cats: Vec<String>,
        #[arg(long = "as", value_name = "USER")]
        username: String,
    },
    List {
        colony: String,
    },
    Update {
        id: ReportId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    Delete {
        id: ReportId,
    },
}

#[derive(Subcommand)]
pub enum CaptureCommand {
    Show {
        id: CaptureId,
    },
    Update {
        id: CaptureId,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        sterilized: Option<bool>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum IllnessCommand {
    Add {
        cat: String,
        diagnosis: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long = "as", value_name = "USER")]
        username: String,
    },
    List {
        cat: String,
    },
    Cure {
        id: IllnessId,
    },
}

#[derive(Subcommand)]
pub enum VaccineCommand {
    /// Catalog entries
    List,
    Apply {
        capture: CaptureId,
        choice: String,
        #[arg(long = "as", value_name = "USER")]
        username: String,
    },
    /// Vaccinations still in effect for a cat
    Effective {
        cat: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    Add {
        username: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long)]
        superuser: bool,
    },
    List,
    Grant {
        username: String,
        permission: String,
    },
    Revoke {
        username: String,
        permission: String,
    },
    Join {
        username: String,
        colony: String,
    },
    Leave {
        username: String,
        colony: String,
    },
    /// Add the user to a configured group
    Group {
        username: String,
        group: String,
    },
    Grants {
        username: String,
    },
}

#[derive(Subcommand)]
pub enum GroupsCommand {
    /// Create or rewrite groups from the `[groups]` config section
    Sync,
    Show {
        name: String,
    },
}

/// Shared state for one invocation.
pub struct Context<'conn> {
    store: SqliteStore<'conn>,
    config: Config,
    catalog: VaccineCatalog,
    json: bool,
}

impl<'conn> Context<'conn> {
    pub fn new(conn: &'conn Connection, config: Config, json: bool) -> CliResult<Self> {
        let catalog = VaccineCatalog::load(config.vaccines.catalog_path.as_deref())?;
        Ok(Self {
            store: SqliteStore::new(conn),
            config,
            catalog,
            json,
        })
    }

    fn today(&self) -> NaiveDate {
        SystemClock.today()
    }

    fn colonies(&self) -> ColonyService<SqliteStore<'conn>, SystemClock> {
        ColonyService::new(self.store, SystemClock)
            .with_default_active_period(self.config.colonies.default_active_period_days)
    }

    fn cats(&self) -> CatService<SqliteStore<'conn>, SystemClock> {
        CatService::new(self.store, SystemClock)
    }

    fn lifecycle(&self) -> LifecycleService<SqliteStore<'conn>, SystemClock, GrantPolicy> {
        LifecycleService::new(self.store, SystemClock, GrantPolicy, &self.config.lifecycle)
    }

    fn records(&self) -> RecordService<SqliteStore<'conn>, SystemClock> {
        RecordService::new(self.store, SystemClock)
    }

    fn health(&self) -> HealthService<SqliteStore<'conn>, SystemClock, GrantPolicy> {
        HealthService::new(self.store, SystemClock, GrantPolicy, self.catalog.clone())
    }

    fn presence(&self) -> PresenceService<SqliteStore<'conn>, GrantPolicy> {
        PresenceService::new(self.store, GrantPolicy)
    }

    fn access(&self) -> AccessService<SqliteStore<'conn>> {
        AccessService::new(self.store)
    }

    fn user(&self, username: &str) -> CliResult<User> {
        Ok(self.access().get_user(username)?)
    }

    /// Prints `value` as JSON, or the text produced by `text`.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> CliResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text(value));
        }
        Ok(())
    }
}

pub fn execute(ctx: &Context<'_>, command: Command) -> CliResult<()> {
    match command {
        Command::Colony(command) => colony(ctx, command),
        Command::Cat(command) => cat(ctx, command),
        Command::Act(args) => {
            let user = ctx.user(&args.username)?;
            let transition = ctx.lifecycle().perform(&user, &args.slug, args.action)?;
            ctx.emit(&transition, render::transition)
        }
        Command::Sweep => {
            let report = ctx.lifecycle().sweep()?;
            ctx.emit(&report, render::sweep)
        }
        Command::Activity(command) => activity(ctx, command),
        Command::Sighting(command) => sighting(ctx, command),
        Command::Feeding(command) => feeding(ctx, command),
        Command::Photo(command) => photo(ctx, command),
        Command::Report(command) => report(ctx, command),
        Command::Capture(command) => capture(ctx, command),
        Command::Illness(command) => illness(ctx, command),
        Command::Vaccine(command) => vaccine(ctx, command),
        Command::User(command) => user(ctx, command),
        Command::Groups(command) => groups(ctx, command),
    }
}

fn colony(ctx: &Context<'_>, command: ColonyCommand) -> CliResult<()> {
    let service = ctx.colonies();
    match command {
        ColonyCommand::Add {
            name,
            slug,
            description,
            active_days,
        } => {
            let colony = service.create_colony(NewColony {
                name,
                description,
                slug,
                active_period_days: active_days,
            })?;
            ctx.emit(&colony, render::colony)
        }
        ColonyCommand::List => {
            let colonies = service.list_colonies()?;
            ctx.emit(&colonies, |colonies| render::lines(colonies, render::colony))
        }
        ColonyCommand::Show { slug } => {
            let colony = service.get_colony(&slug)?;
            ctx.emit(&colony, render::colony)
        }
        ColonyCommand::Update {
            slug,
            name,
            description,
            active_days,
        } => {
            let colony = service.update_colony(
                &slug,
                ColonyUpdate {
                    name,
                    description,
                    active_period_days: active_days,
                },
            )?;
            ctx.emit(&colony, render::colony)
        }
        ColonyCommand::Delete { slug } => {
            service.delete_colony(&slug)?;
            info!("event=colony_delete module=cli status=ok colony={slug}");
            ctx.emit(&slug, |slug| format!("deleted colony {slug}"))
        }
        ColonyCommand::Active { slug, since } => {
            let range = DateRange {
                min: since,
                max: None,
            };
            let cats = service.active_cats(&slug, range)?;
            ctx.emit(&cats, |cats| render::lines(cats, render::cat))
        }
        ColonyCommand::Missing { slug } => {
            let cats = service.missing_cats(&slug)?;
            ctx.emit(&cats, |cats| render::lines(cats, render::cat))
        }
        ColonyCommand::Dead { slug } => {
            let cats = service.dead_cats(&slug)?;
            ctx.emit(&cats, |cats| render::lines(cats, render::cat))
        }
        ColonyCommand::Sightings { slug, date } => {
            let sheet = service.sightings_on(&slug, date.unwrap_or_else(|| ctx.today()))?;
            ctx.emit(&sheet, render::sighting_sheet)
        }
    }
}

fn cat(ctx: &Context<'_>, command: CatCommand) -> CliResult<()> {
    let service = ctx.cats();
    match command {
        CatCommand::Add {
            colony,
            name,
            sex,
            color,
            description,
            neighbour,
        } => {
            let mut input = NewCat::new(name, sex);
            input.color = color;
            input.description = description;
            if let Some(owner) = neighbour {
                input.is_neighbour = true;
                input.neighbour_name = owner;
            }
            let cat = service.create_cat(&colony, input)?;
            ctx.emit(&cat, render::cat)
        }
        CatCommand::List {
            colony,
            with_neighbours,
        } => {
            let cats = ctx.colonies().list_cats(&colony, with_neighbours)?;
            ctx.emit(&cats, |cats| render::lines(cats, render::cat))
        }
        CatCommand::InState { state } => {
            let cats = service.list_in_state(state)?;
            ctx.emit(&cats, |cats| render::lines(cats, render::cat))
        }
        CatCommand::Show { slug } => {
            let profile = service.profile(&slug, &ctx.config.app.placeholder_photo_url)?;
            ctx.emit(&profile, render::profile)
        }
        CatCommand::Update {
            slug,
            name,
            color,
            description,
            ugly,
            portrait,
        } => {
            let cat = service.update_cat(
                &slug,
                CatUpdate {
                    name,
                    color,
                    description,
                    is_ugly: ugly,
                    portrait_photo_id: portrait.map(Some),
                    ..CatUpdate::default()
                },
            )?;
            ctx.emit(&cat, render::cat)
        }
        CatCommand::Delete { slug } => {
            service.delete_cat(&slug)?;
            ctx.emit(&slug, |slug| format!("deleted cat {slug}"))
        }
        CatCommand::Actions { slug, username } => {
            let user = ctx.user(&username)?;
            let actions = ctx.lifecycle().available_actions(&user, &slug)?;
            ctx.emit(&actions, |actions| {
                actions
                    .iter()
                    .map(|action| action.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
        }
    }
}

fn activity(ctx: &Context<'_>, command: ActivityCommand) -> CliResult<()> {
    let (grid, args) = match command {
        ActivityCommand::Colony(args) => {
            let today = args.date.unwrap_or_else(|| ctx.today());
            (ctx.colonies().activity_map(&args.slug, today, args.locale)?, args)
        }
        ActivityCommand::Cat(args) => {
            let today = args.date.unwrap_or_else(|| ctx.today());
            (ctx.cats().activity_map(&args.slug, today, args.locale)?, args)
        }
    };
    info!(
        "event=activity_map module=cli status=ok slug={} total={} weeks={}",
        args.slug, grid.total, grid.weeks
    );
    ctx.emit(&grid, render::heatmap)
}

fn sighting(ctx: &Context<'_>, command: SightingCommand) -> CliResult<()> {
    match command {
        SightingCommand::Toggle {
            cat,
            date,
            username,
        } => {
            let user = ctx.user(&username)?;
            let date = date.unwrap_or_else(|| ctx.today());
            let sighted = ctx.presence().toggle_sighting(&user, &cat, date)?;
            ctx.emit(&sighted, |sighted| {
                let verb = if *sighted { "sighted" } else { "not sighted" };
                format!("{cat} {verb} on {date}")
            })
        }
    }
}

fn feeding(ctx: &Context<'_>, command: FeedingCommand) -> CliResult<()> {
    match command {
        FeedingCommand::Toggle {
            colony,
            date,
            username,
        } => {
            let user = ctx.user(&username)?;
            let date = date.unwrap_or_else(|| ctx.today());
            let outcome = ctx.presence().toggle_feeding(&user, &colony, date)?;
            ctx.emit(&outcome, |outcome| render::feeding_toggle(outcome, date))
        }
        FeedingCommand::Schedule { colony, from, to } => {
            let schedule = ctx.presence().feeding_schedule(&colony, from, to)?;
            ctx.emit(&schedule, |schedule| {
                render::lines(schedule, |entry| format!("{} {}", entry.date, entry.username))
            })
        }
    }
}

fn photo(ctx: &Context<'_>, command: PhotoCommand) -> CliResult<()> {
    let service = ctx.records();
    match command {
        PhotoCommand::Add {
            colony,
            file,
            description,
            date,
            ugly,
            cats,
            username,
        } => {
            let user = ctx.user(&username)?;
            let photo = service.add_photo(
                &user,
                &colony,
                NewPhoto {
                    file_path: file,
                    description,
                    taken_on: date,
                    is_ugly: ugly,
                    cat_slugs: cats,
                },
            )?;
            ctx.emit(&photo, render::photo)
        }
        PhotoCommand::List { colony, showcase } => {
            let photos = if showcase {
                service.showcase_photos(&colony)?
            } else {
                service.list_photos(&colony)?
            };
            ctx.emit(&photos, |photos| render::lines(photos, render::photo))
        }
        PhotoCommand::Tag { id, cat } => {
            let photo = service.tag_photo(id, &cat)?;
            ctx.emit(&photo, render::photo)
        }
        PhotoCommand::Untag { id, cat } => {
            let photo = service.untag_photo(id, &cat)?;
            ctx.emit(&photo, render::photo)
        }
        PhotoCommand::Delete { id } => {
            service.delete_photo(id)?;
            ctx.emit(&id, |id| format!("deleted photo {id}"))
        }
    }
}

fn report(ctx: &Context<'_>, command: ReportCommand) -> CliResult<()> {
    let service = ctx.records();
    match command {
        ReportCommand::Add {
            colony,
            title,
            body,
            date,
            cats,
            username,
        } => {
            let user = ctx.user(&username)?;
            let report = service.add_report(
                &user,
                &colony,
                NewReport {
                    title,
                    body,
                    date,
                    cat_slugs: cats,
                },
            )?;
            ctx.emit(&report, render::report)
        }
        ReportCommand::List { colony } => {
            let reports = service.list_reports(&colony)?;
            ctx.emit(&reports, |reports| render::lines(reports, render::report))
        }
        ReportCommand::Update {
            id,
            title,
            body,
            date,
        } => {
            let report = service.update_report(
                id,
                ReportUpdate {
                    title,
                    body: body.map(Some),
                    date,
                    cat_slugs: None,
                },
            )?;
            ctx.emit(&report, render::report)
        }
        ReportCommand::Delete { id } => {
            service.delete_report(id)?;
            ctx.emit(&id, |id| format!("deleted report {id}"))
        }
    }
}

fn capture(ctx: &Context<'_>, command: CaptureCommand) -> CliResult<()> {
    let service = ctx.health();
    match command {
        CaptureCommand::Show { id } => {
            let capture = service.get_capture(id)?;
            ctx.emit(&capture, render::capture)
        }
        CaptureCommand::Update {
            id,
            weight,
            sterilized,
            notes,
        } => {
            let capture = service.update_capture(
                id,
                CaptureUpdate {
                    weight_kg: weight.map(Some),
                    sterilized,
                    notes,
                },
            )?;
            ctx.emit(&capture, render::capture)
        }
    }
}

fn illness(ctx: &Context<'_>, command: IllnessCommand) -> CliResult<()> {
    let service = ctx.health();
    match command {
        IllnessCommand::Add {
            cat,
            diagnosis,
            notes,
            username,
        } => {
            let user = ctx.user(&username)?;
            let illness = service.diagnose(&user, &cat, &diagnosis, &notes)?;
            ctx.emit(&illness, render::illness)
        }
        IllnessCommand::List { cat } => {
            let illnesses = service.illnesses(&cat)?;
            ctx.emit(&illnesses, |illnesses| {
                render::lines(illnesses, render::illness)
            })
        }
        IllnessCommand::Cure { id } => {
            let illness = service.cure(id)?;
            ctx.emit(&illness, render::illness)
        }
    }
}

fn vaccine(ctx: &Context<'_>, command: VaccineCommand) -> CliResult<()> {
    let service = ctx.health();
    match command {
        VaccineCommand::List => {
            let vaccines: Vec<_> = service.catalog().iter().cloned().collect();
            ctx.emit(&vaccines, |vaccines| {
                render::lines(vaccines, |vaccine| {
                    format!(
                        "{:<16} {:>4}d  {}",
                        vaccine.choice_name, vaccine.effect_days, vaccine.name
                    )
                })
            })
        }
        VaccineCommand::Apply {
            capture,
            choice,
            username,
        } => {
            let user = ctx.user(&username)?;
            let vaccination = service.vaccinate(&user, capture, &choice)?;
            ctx.emit(&vaccination, render::vaccination)
        }
        VaccineCommand::Effective { cat } => {
            let vaccinations = service.effective_vaccinations(&cat)?;
            ctx.emit(&vaccinations, |vaccinations| {
                render::lines(vaccinations, render::vaccination)
            })
        }
    }
}

fn user(ctx: &Context<'_>, command: UserCommand) -> CliResult<()> {
    let service = ctx.access();
    match command {
        UserCommand::Add {
            username,
            first_name,
            last_name,
            superuser,
        } => {
            let user = service.create_user(NewUser {
                username,
                first_name,
                last_name,
                is_superuser: superuser,
            })?;
            ctx.emit(&user, render::user)
        }
        UserCommand::List => {
            let users = service.list_users()?;
            ctx.emit(&users, |users| render::lines(users, render::user))
        }
        UserCommand::Grant {
            username,
            permission,
        } => {
            let permission = service.grant(&username, &permission)?;
            let code = permission.as_str();
            ctx.emit(&code, |code| format!("granted {code} to {username}"))
        }
        UserCommand::Revoke {
            username,
            permission,
        } => {
            let revoked = service.revoke(&username, &permission)?;
            ctx.emit(&revoked, |revoked| {
                if *revoked {
                    format!("revoked {permission} from {username}")
                } else {
                    format!("{username} had no direct {permission} grant")
                }
            })
        }
        UserCommand::Join { username, colony } => {
            service.join(&username, &colony)?;
            ctx.emit(&colony, |colony| format!("{username} joined {colony}"))
        }
        UserCommand::Leave { username, colony } => {
            let left = service.leave(&username, &colony)?;
            ctx.emit(&left, |left| {
                if *left {
                    format!("{username} left {colony}")
                } else {
                    format!("{username} was not a member of {colony}")
                }
            })
        }
        UserCommand::Group { username, group } => {
            service.add_to_group(&username, &group)?;
            ctx.emit(&group, |group| format!("{username} added to {group}"))
        }
        UserCommand::Grants { username } => {
            let grants = service.grants(&username)?;
            let codes: Vec<&str> = grants
                .permissions
                .iter()
                .map(|permission| permission.as_str())
                .collect();
            let colonies: Vec<_> = grants.colonies.iter().copied().collect();
            ctx.emit(
                &serde_json::json!({ "permissions": codes, "colonies": colonies }),
                |_| format!("permissions: {}\ncolonies: {colonies:?}", codes.join(" ")),
            )
        }
    }
}

fn groups(ctx: &Context<'_>, command: GroupsCommand) -> CliResult<()> {
    let service = ctx.access();
    match command {
        GroupsCommand::Sync => {
            let synced = service.sync_groups_from_config(&ctx.config)?;
            ctx.emit(&synced, |synced| format!("synced {synced} group(s)"))
        }
        GroupsCommand::Show { name } => {
            let permissions = service
                .group_permissions(&name)?
                .ok_or_else(|| format!("group not found: {name}"))?;
            let codes: Vec<&str> = permissions
                .iter()
                .map(|permission| permission.as_str())
                .collect();
            ctx.emit(&codes, |codes| codes.join(" "))
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD, got `{value}`: {err}"))
}

fn parse_sex(value: &str) -> Result<Sex, String> {
    Sex::parse(value).ok_or_else(|| format!("unknown sex `{value}`; expected M or H"))
}

fn parse_state(value: &str) -> Result<CatState, String> {
    CatState::parse(value).ok_or_else(|| format!("unknown state `{value}`"))
}

fn parse_action(value: &str) -> Result<CatAction, String> {
    CatAction::parse(value).ok_or_else(|| format!("unknown action `{value}`"))
}

fn parse_locale(value: &str) -> Result<Locale, String> {
    Locale::parse(value).ok_or_else(|| format!("unknown locale `{value}`; expected es or en"))
}
