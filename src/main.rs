use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use quillpost::config::DEFAULT_CONFIG_FILE;
use quillpost::fs_utils::read_file_contents;
use quillpost::publish::{self, PublishAction};
use quillpost::{
    BlogService, BloggerClient, Destination, ExpanderConfig, PublishOptions, PublishOutcome,
    QuillError, RcConfig, Result, assemble, render_file,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
Source document:
  title: My post             - header lines, `name: value`
  ---                        - separator
  <p>Body HTML...</p>        - newlines outside <pre>/<code> are removed

Template constructs:
  {{ name }}                              - variable (title/content in base templates)
  {# comment #}                           - dropped
  {% include "file.html" %}               - file from the include path
  {% raw %}...{% endraw %}                - literal text
  {% code "python", [2, 3] %}...{% endcode %}
                                          - highlighted code, lines 2 and 3 emphasized
  {% shell ["sort", "-r"] %}...{% endshell %}
                                          - command output, block body as stdin

Config file (.blogrc):
  One `name:value` or bare `name` per line. Names: draft, update, template,
  blog, username, token. Values only fill options not given on the command line.

Examples:
  # Preview the HTML
  quillpost render post.txt
  # Preview inside a base template, as JSON
  quillpost render post.txt -t base.html -f json
  # List your blogs
  quillpost ls-blogs
  # Post as a draft, replacing an earlier version with the same title
  quillpost post post.txt -b "My Blog" --draft --update
"#;

/// Render and publish blog posts.
///
/// Licensed under the EUPL v1.2.
#[derive(Parser, Debug)]
#[command(
    name = "quillpost",
    version,
    about = "Render posts with highlighted code and shell output, then publish them to Blogger.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Config file with option defaults
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "QUILLPOST_CONFIG",
        default_value = DEFAULT_CONFIG_FILE,
        global = true
    )]
    config: PathBuf,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a source document to HTML on stdout
    Render(RenderArgs),
    /// Render a source document and publish it
    Post(PostArgs),
    /// List the blogs of the user
    LsBlogs(AccountArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Source document
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Base template wrapping the rendered body
    #[arg(short, long, value_name = "TEMPLATE")]
    template: Option<PathBuf>,

    /// Directory searched by {% include %} (repeatable)
    #[arg(short, long = "include", value_name = "DIR", action = clap::ArgAction::Append)]
    include: Vec<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "plain")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct PostArgs {
    /// Source document
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Save as a draft instead of publishing
    #[arg(short, long)]
    draft: bool,

    /// Replace an existing post with the same title
    #[arg(long)]
    update: bool,

    /// Title of the destination blog
    #[arg(short, long, value_name = "NAME")]
    blog: Option<String>,

    /// Directory searched by {% include %} (repeatable)
    #[arg(short, long = "include", value_name = "DIR", action = clap::ArgAction::Append)]
    include: Vec<PathBuf>,

    #[command(flatten)]
    account: AccountArgs,
}

#[derive(Args, Debug)]
struct AccountArgs {
    /// Blogger user id (defaults to the owner of the token)
    #[arg(short, long, value_name = "USER")]
    username: Option<String>,

    /// OAuth 2.0 access token
    #[arg(long, value_name = "TOKEN", env = "BLOGGER_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl AccountArgs {
    fn fill_from(&mut self, rc: &RcConfig) {
        rc.fill("username", &mut self.username);
        rc.fill("token", &mut self.token);
    }

    fn client(&self) -> Result<BloggerClient> {
        let token = self.token.as_deref().ok_or(QuillError::MissingToken)?;
        Ok(BloggerClient::new(token, self.username.as_deref()))
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// The HTML body
    Plain,
    /// Headers and body as JSON
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let Some(command) = cli.command else {
        eprintln!("{}", Cli::command().render_help());
        std::process::exit(1);
    };

    let result = RcConfig::load(&cli.config).and_then(|rc| match command {
        Commands::Render(args) => run_render(args, &rc),
        Commands::Post(args) => run_post(args, &rc),
        Commands::LsBlogs(mut args) => {
            args.fill_from(&rc);
            args.client().and_then(|client| print_blogs(&client))
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(exit_code(&e));
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,quillpost={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn exit_code(error: &QuillError) -> i32 {
    match error.root() {
        QuillError::DuplicatePost { .. }
        | QuillError::BlogNotFound { .. }
        | QuillError::MissingToken => 2,
        _ => 1,
    }
}

/// Include path for `source`: the given directories, then the source's own.
fn include_dirs(include: &[PathBuf], source: &Path) -> Vec<PathBuf> {
    let source_dir = match source.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    include
        .iter()
        .cloned()
        .chain(std::iter::once(source_dir))
        .collect()
}

fn run_render(mut args: RenderArgs, rc: &RcConfig) -> Result<()> {
    rc.fill("template", &mut args.template);

    let config = ExpanderConfig::with_include_dirs(include_dirs(&args.include, &args.source));
    let document = render_file(&args.source, &config)?;

    let base_template = args
        .template
        .as_deref()
        .map(|path| {
            debug!(path = %path.display(), "reading base template");
            read_file_contents(path)
        })
        .transpose()?;
    let artifact = assemble(
        document.headers,
        &document.body,
        base_template.as_deref(),
        Destination::Local,
        &config,
    )?;

    match args.format {
        OutputFormat::Plain => println!("{}", artifact.body),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&artifact)?),
    }
    io::stdout().flush()?;
    Ok(())
}

fn run_post(mut args: PostArgs, rc: &RcConfig) -> Result<()> {
    rc.fill_flag("draft", &mut args.draft);
    rc.fill_flag("update", &mut args.update);
    rc.fill("blog", &mut args.blog);
    args.account.fill_from(rc);

    let client = args.account.client()?;
    let Some(blog) = args.blog.as_deref() else {
        eprintln!("No blog given. Pick one with --blog:");
        print_blogs(&client)?;
        std::process::exit(2);
    };

    let config = ExpanderConfig::with_include_dirs(include_dirs(&args.include, &args.source));
    let document = render_file(&args.source, &config)?;
    let artifact = assemble(
        document.headers,
        &document.body,
        None,
        Destination::Post,
        &config,
    )?;
    let title = artifact.title().ok_or(QuillError::MissingTitle)?;

    let options = PublishOptions {
        blog,
        draft: args.draft,
        update: args.update,
    };
    let action = publish::plan(&client, title, options)?;
    match action {
        PublishAction::Create { .. } => println!("posting..."),
        PublishAction::Update(_) => println!("updating..."),
    }
    match publish::apply(&client, action, &artifact, options.draft)? {
        PublishOutcome::Created(_) => println!("Posted"),
        PublishOutcome::Updated(_) => println!("Updated"),
    }
    Ok(())
}

fn print_blogs(service: &dyn BlogService) -> Result<()> {
    for blog in service.list_blogs()? {
        println!("  {}", blog.title);
    }
    Ok(())
}
