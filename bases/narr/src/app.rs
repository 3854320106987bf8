// bases/narr/src/app.rs
use std::path::Path;

use audio_tools::Ffmpeg;
use audiobook::{
    discover, DiscoveryMode, Library, Project, ProjectConfig, ProjectDependencies, Rewrite,
};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::args::{Args, CheckPart, Command, FilesCommand, MetadataCommand, RewriteArgs, Selection};
use crate::output::OutputHandler;

pub struct App {
    args: Args,
    output: OutputHandler,
}

impl App {
    pub fn new(args: Args) -> Self {
        let output = OutputHandler::new(args.verbose);
        Self { args, output }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Command::Run { selection, codec } => self.convert(selection, codec.as_deref()).await,
            Command::Check { selection, only } => self.check(selection, *only).await,
            Command::Generate { dir } => self.generate(dir),
            Command::Metadata { command } => self.metadata(command).await,
            Command::Files { command } => self.files(command).await,
        }
    }

    fn projects(&self, selection: &Selection, deps: &ProjectDependencies) -> Result<Vec<Project>> {
        let mode = DiscoveryMode::from_flags(selection.recursive, selection.multi)?;
        let configs = discover(&selection.path, mode).wrap_err_with(|| {
            format!("could not create project(s) for {}", selection.path.display())
        })?;

        tracing::debug!("found {} project(s)", configs.len());

        configs
            .into_iter()
            .map(|config| {
                let dir = config.project_dir.clone();
                Project::new(config, deps.clone())
                    .wrap_err_with(|| format!("invalid project {}", dir.display()))
            })
            .collect()
    }

    async fn convert(&self, selection: &Selection, codec: Option<&str>) -> Result<()> {
        Ffmpeg::check_available()?;

        let deps = ProjectDependencies::ffmpeg(codec);
        let projects = self.projects(selection, &deps)?;

        let mut outputs = Vec::with_capacity(projects.len());
        for project in &projects {
            self.output.print_project_start(project.project_dir());
            let path = project.convert().await.wrap_err_with(|| {
                format!("could not convert {} to m4b", project.project_dir().display())
            })?;
            outputs.push(path);
        }

        self.output.print_outputs(&outputs);
        Ok(())
    }

    async fn check(&self, selection: &Selection, only: Option<CheckPart>) -> Result<()> {
        let deps = ProjectDependencies::ffmpeg(None);
        let parts = match only {
            Some(part) => vec![part],
            None => CheckPart::ALL.to_vec(),
        };

        for project in self.projects(selection, &deps)? {
            self.output.print_project_start(project.project_dir());

            for part in &parts {
                match part {
                    CheckPart::Files => {
                        let tracks = project.tracks().await?;
                        self.output.print_files(tracks);
                    }
                    CheckPart::Chapters => {
                        if project.config().has_chapters {
                            let chapters = project.chapters().await?;
                            self.output.print_section("Chapters", &chapters.markers());
                        } else if only.is_some() {
                            self.output.print_section("Chapters", "disabled by hasChapters");
                        }
                    }
                    CheckPart::Metadata => {
                        let metadata = project.metadata().await?;
                        self.output.print_section("Metadata", &metadata);
                    }
                    CheckPart::Filename => {
                        let filename = project.filename().await?;
                        let status = if project.already_completed().await {
                            " (already completed)"
                        } else {
                            ""
                        };
                        self.output.print_section(
                            "Filename",
                            &format!("{}{status}", filename.display()),
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn generate(&self, dir: &Path) -> Result<()> {
        let file = ProjectConfig::generate(dir)?;
        self.output.print_generated(&file);
        Ok(())
    }

    async fn metadata(&self, command: &MetadataCommand) -> Result<()> {
        Ffmpeg::check_tools(&["ffmpeg"])?;
        let library = Library::ffmpeg();

        match command {
            MetadataCommand::Show { path, tags } => {
                let books = library
                    .show(path)
                    .await
                    .wrap_err_with(|| format!("could not show tags below {}", path.display()))?;
                for book in &books {
                    self.output.print_book_tags(book, tags);
                }
            }
            MetadataCommand::Edit {
                path,
                tags,
                rewrite,
            } => {
                let edits = library
                    .edit(path, tags, &rewrite_of(rewrite)?, rewrite.dry_run)
                    .await
                    .wrap_err_with(|| format!("could not edit tags below {}", path.display()))?;
                for edit in &edits {
                    self.output.print_edit(edit);
                }
            }
        }

        Ok(())
    }

    async fn files(&self, command: &FilesCommand) -> Result<()> {
        let library = Library::ffmpeg();

        match command {
            FilesCommand::List { path, no_path } => {
                let books = library.books(path).await?;
                self.output.print_books(&books, *no_path);
            }
            FilesCommand::Rename { path, rewrite } => {
                let renames = library
                    .rename(path, &rewrite_of(rewrite)?, rewrite.dry_run)
                    .await
                    .wrap_err_with(|| format!("could not rename files below {}", path.display()))?;
                self.output.print_renames(&renames, rewrite.dry_run);
            }
        }

        Ok(())
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        self.output.print_error(error);
    }
}

fn rewrite_of(args: &RewriteArgs) -> Result<Rewrite> {
    Ok(Rewrite::new(&args.regex, args.format.as_str())?)
}
