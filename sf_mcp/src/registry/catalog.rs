//! The fixed tool catalog.
//!
//! Parameter order matters: validated arguments, and therefore the generated
//! flags, follow the order declared here.

use super::{CommandTemplate, ParamKind, ParameterSpec, ToolDefinition};

pub const ORG_LIST: &str = "sf_org_list";
pub const DATA_QUERY: &str = "sf_data_query";
pub const PROJECT_DEPLOY: &str = "sf_project_deploy";
pub const PROJECT_RETRIEVE: &str = "sf_project_retrieve";
pub const APEX_TEST_RUN: &str = "sf_apex_test_run";
pub const DATA_IMPORT: &str = "sf_data_import";
pub const PACKAGE_CREATE: &str = "sf_package_create";
pub const CUSTOM_COMMAND: &str = "sf_custom_command";

const TARGET_ORG: ParameterSpec = ParameterSpec::optional(
    "targetOrg",
    ParamKind::String,
    "Username or alias of the target org",
);

const DEPLOY_TEST_LEVELS: &[&str] = &[
    "NoTestRun",
    "RunSpecifiedTests",
    "RunLocalTests",
    "RunAllTestsInOrg",
];

const APEX_TEST_LEVELS: &[&str] = &["RunLocalTests", "RunAllTestsInOrg", "RunSpecifiedTests"];

pub static TOOLS: &[ToolDefinition] = &[
    ToolDefinition {
        name: ORG_LIST,
        description: "List all authorized Salesforce orgs",
        command: CommandTemplate::Prefix(&["org", "list", "--json"]),
        parameters: &[
            ParameterSpec::optional(
                "all",
                ParamKind::Boolean,
                "Show all orgs, including expired and deleted ones",
            ),
            ParameterSpec::optional(
                "clean",
                ParamKind::Boolean,
                "Remove all local org authorization files for non-active orgs",
            ),
            ParameterSpec::optional(
                "skipConnectionStatus",
                ParamKind::Boolean,
                "Skip retrieving the connection status of each org",
            ),
        ],
    },
    ToolDefinition {
        name: DATA_QUERY,
        description: "Execute a SOQL query against a Salesforce org",
        command: CommandTemplate::Prefix(&["data", "query", "--json"]),
        parameters: &[
            ParameterSpec::required("query", ParamKind::String, "SOQL query to execute"),
            TARGET_ORG,
            ParameterSpec::optional(
                "useToolingApi",
                ParamKind::Boolean,
                "Use Tooling API instead of standard API",
            ),
            ParameterSpec::optional(
                "bulk",
                ParamKind::Boolean,
                "Use Bulk API 2.0 for large queries",
            ),
        ],
    },
    ToolDefinition {
        name: PROJECT_DEPLOY,
        description: "Deploy metadata to a Salesforce org",
        command: CommandTemplate::Prefix(&["project", "deploy", "start", "--json"]),
        parameters: &[
            ParameterSpec::optional(
                "sourcePath",
                ParamKind::String,
                "Path to source files to deploy",
            ),
            ParameterSpec::optional(
                "metadata",
                ParamKind::StringList,
                "Metadata components to deploy",
            ),
            TARGET_ORG,
            ParameterSpec::optional(
                "checkOnly",
                ParamKind::Boolean,
                "Validate deploy but don't save to the org",
            ),
            ParameterSpec::optional("testLevel", ParamKind::Enum(DEPLOY_TEST_LEVELS), "")
                .undocumented(),
            ParameterSpec::optional(
                "wait",
                ParamKind::Number,
                "Wait time for deployment to complete (in minutes)",
            ),
        ],
    },
    ToolDefinition {
        name: PROJECT_RETRIEVE,
        description: "Retrieve metadata from a Salesforce org",
        command: CommandTemplate::Prefix(&["project", "retrieve", "start", "--json"]),
        parameters: &[
            TARGET_ORG,
            ParameterSpec::optional(
                "metadata",
                ParamKind::StringList,
                "Metadata components to retrieve",
            ),
            ParameterSpec::optional(
                "sourcePath",
                ParamKind::String,
                "Path to save retrieved source files",
            ),
            ParameterSpec::optional(
                "packageNames",
                ParamKind::StringList,
                "Package names to retrieve",
            ),
            ParameterSpec::optional(
                "wait",
                ParamKind::Number,
                "Wait time for retrieve to complete (in minutes)",
            ),
        ],
    },
    ToolDefinition {
        name: APEX_TEST_RUN,
        description: "Run Apex tests in a Salesforce org",
        command: CommandTemplate::Prefix(&["apex", "test", "run", "--json"]),
        parameters: &[
            TARGET_ORG,
            ParameterSpec::optional("testLevel", ParamKind::Enum(APEX_TEST_LEVELS), "")
                .undocumented(),
            ParameterSpec::optional(
                "classNames",
                ParamKind::StringList,
                "Apex test class names to run",
            ),
            ParameterSpec::optional(
                "suiteNames",
                ParamKind::StringList,
                "Apex test suite names to run",
            ),
            ParameterSpec::optional(
                "outputDir",
                ParamKind::String,
                "Directory to store test results",
            ),
            ParameterSpec::optional(
                "wait",
                ParamKind::Number,
                "Wait time for tests to complete (in minutes)",
            ),
        ],
    },
    ToolDefinition {
        name: DATA_IMPORT,
        description: "Import data from a CSV file into a Salesforce org",
        command: CommandTemplate::Prefix(&["data", "import", "tree", "--json"]),
        parameters: &[
            ParameterSpec::required("file", ParamKind::String, "Path to CSV file to import"),
            ParameterSpec::required("sobject", ParamKind::String, "sObject type for the data"),
            TARGET_ORG,
            ParameterSpec::optional(
                "wait",
                ParamKind::Number,
                "Wait time for import to complete (in minutes)",
            ),
        ],
    },
    ToolDefinition {
        name: PACKAGE_CREATE,
        description: "Create a new Salesforce package",
        command: CommandTemplate::Prefix(&["package", "create", "--json"]),
        parameters: &[
            ParameterSpec::required("name", ParamKind::String, "Package name"),
            ParameterSpec::required(
                "packageType",
                ParamKind::Enum(&["Managed", "Unlocked"]),
                "Package type",
            ),
            ParameterSpec::required("path", ParamKind::String, "Path to package directory"),
            ParameterSpec::optional(
                "targetDevHub",
                ParamKind::String,
                "Username or alias of the Dev Hub org",
            ),
            ParameterSpec::optional("description", ParamKind::String, "Package description"),
        ],
    },
    ToolDefinition {
        name: CUSTOM_COMMAND,
        description: "Execute a custom Salesforce CLI command",
        command: CommandTemplate::RawCommand,
        parameters: &[ParameterSpec::required(
            "command",
            ParamKind::String,
            "Full Salesforce CLI command to execute (without 'sf' prefix)",
        )],
    },
];
