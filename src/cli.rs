use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "aish", version, about = "Natural-language shell assistant", long_about = None)]
pub struct Args {
    /// Natural language prompt
    pub prompt: Option<String>,

    /// Generate a shell command and offer to execute it
    #[arg(short, long, conflicts_with = "code")]
    pub shell: bool,

    /// Generate code only, no explanations
    #[arg(short, long)]
    pub code: bool,

    /// Use a specific role
    #[arg(long, conflicts_with_all = ["shell", "code"])]
    pub role: Option<String>,

    /// Continue (or start) a named chat session
    #[arg(long, value_name = "NAME")]
    pub chat: Option<String>,

    /// Interactive REPL against a named chat session
    #[arg(long, value_name = "NAME", conflicts_with = "chat")]
    pub repl: Option<String>,

    /// List stored chat sessions
    #[arg(long)]
    pub list_chats: bool,

    /// Print the transcript of a stored chat session
    #[arg(long, value_name = "NAME")]
    pub show_chat: Option<String>,

    /// Delete a stored chat session
    #[arg(long, value_name = "NAME")]
    pub delete_chat: Option<String>,

    /// List available roles
    #[arg(long)]
    pub list_roles: bool,

    /// Model to use (provider-specific)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff
    #[arg(long)]
    pub top_p: Option<f32>,

    /// AI provider to use (openai, openrouter, deepseek, compatible)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Skip the response cache for this invocation
    #[arg(long)]
    pub no_cache: bool,

    /// Empty the response cache and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Execute the generated command without confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Enable debug logging to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
