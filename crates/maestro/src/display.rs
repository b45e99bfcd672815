//! Dry-run rendering of the resolved configuration.

use colored::Colorize;
use maestro_config::LoadedConfig;

pub fn print_config(config: &LoadedConfig) {
    println!("  domain: {}", config.domain.cyan());
    println!("  pulumi.enabled: {}", config.pulumi.enabled);
    println!("  pulumi.command: {}", config.pulumi.command);
    println!(
        "  pulumi.cloudflareAccountId: {}",
        or_not_set(&config.pulumi.cloudflare_account_id)
    );
    println!("  pulumi.sshPort: {}", config.pulumi.ssh_port);

    if config.pulumi.stacks.is_empty() {
        println!("  pulumi.stacks: (none)");
    } else {
        println!("  pulumi.stacks:");
        for (name, stack) in &config.pulumi.stacks {
            println!(
                "    - {} ({} server(s))",
                name.to_string().cyan(),
                stack.servers.len()
            );
        }
    }

    let roles: Vec<&str> = config.roles.iter().map(|r| r.as_str()).collect();
    println!("  detected roles: [{}]", roles.join(", "));

    println!("  ansible.enabled: {}", config.ansible.enabled);
    println!("  ansible.web:");
    if let Some(static_site) = &config.ansible.web.static_site {
        println!("    mode: static");
        println!("    static.source: {}", static_site.source);
        match static_site.source {
            maestro_config::StaticSource::Local => {
                println!("    static.dir: {}", static_site.dir);
                println!("    static.build: {}", or_none(&static_site.build));
                println!("    static.dist: {}", static_site.dist);
            }
            maestro_config::StaticSource::Image => {
                println!("    static.image: {}", static_site.image);
                println!("    static.tag: {}", static_site.tag);
                println!("    static.path: {}", static_site.path);
            }
        }
    } else if let Some(docker) = &config.ansible.web.docker {
        println!("    mode: docker");
        println!("    docker.image: {}", docker.image);
        println!("    docker.tag: {}", docker.tag);
        println!("    docker.port: {}", docker.port);
    } else {
        println!("    mode: (not configured)");
    }

    println!("  ansible.backend:");
    println!("    image: {}", or_not_set(&config.ansible.backend.image));
    println!("    tag: {}", or_not_set(&config.ansible.backend.tag));
    println!("    port: {}", config.ansible.backend.port);
    println!("  ansible.groups: [{}]", config.ansible.groups.join(", "));

    println!("  secrets.provider: {}", config.secrets.provider);
    println!(
        "  secrets.projectId: {}",
        or_not_set(&config.secrets.project_id)
    );
    println!(
        "  secrets.requiredVars: [{}]",
        config.secrets.required_vars.join(", ")
    );

    println!("  Backend environment variables:");
    if config.ansible.backend.env.is_empty() {
        println!("    (none)");
    } else {
        for (key, value) in &config.ansible.backend.env {
            println!("    {key}={value}");
        }
    }

    if let Some(docker) = &config.ansible.web.docker {
        println!("  Web docker environment variables:");
        if docker.env.is_empty() {
            println!("    (none)");
        } else {
            for (key, value) in &docker.env {
                println!("    {key}={value}");
            }
        }
    }
}

fn or_not_set(value: &str) -> &str {
    if value.is_empty() { "<not set>" } else { value }
}

fn or_none(value: &str) -> &str {
    if value.is_empty() { "<none>" } else { value }
}
